//! Shade - Confidential Note Core
//!
//! Building blocks for shielded UTXOs on a privacy pool.
//!
//! # Modules
//! - `account`: Spend and transport identities derived from a seed
//! - `utxo`: Notes, their commitments and nullifiers, wire format and encryption
//! - `registry`: Asset allowlist mapping addresses to wire indices
//! - `crypto`: Poseidon hash, field conversions and note encryption
//! - `error`: Structured error codes
//!
//! Python bindings are available behind the `python` feature.

pub mod account;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod registry;
pub mod utxo;

// Re-export common types
pub use account::{Account, AccountPublic, FullAccount};
pub use error::{ShadeError, ShadeResult, UtxoError, UtxoErrorCode};
pub use registry::{Address, AssetRegistry, RegistryEntry, StaticAssetRegistry, FEE_ASSET, MINT};
pub use utxo::{AppDataFromBytes, DecryptedUtxo, Utxo, UtxoBuilder};

#[cfg(feature = "python")]
mod python {
    use pyo3::exceptions::{PyRuntimeError, PyValueError};
    use pyo3::prelude::*;
    use pyo3::types::PyBytes;

    use crate::account::Account;
    use crate::constants::BLINDING_BYTES;
    use crate::crypto::field::fr_to_be_bytes;
    use crate::crypto::poseidon_hash_bytes;
    use crate::registry::Address;
    use crate::utxo::Utxo;

    fn seed_from_bytes(seed: &[u8]) -> PyResult<[u8; 32]> {
        seed.try_into()
            .map_err(|_| PyValueError::new_err("Seed must be 32 bytes"))
    }

    fn build_utxo(
        seed: &[u8],
        assets: Vec<String>,
        amounts: Vec<u64>,
        blinding: &[u8],
        pool_type: u64,
        index: Option<u64>,
    ) -> PyResult<Utxo> {
        let account = Account::from_seed(&seed_from_bytes(seed)?);

        let assets = assets
            .iter()
            .map(|s| s.parse::<Address>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;

        let blinding: [u8; BLINDING_BYTES] = blinding
            .try_into()
            .map_err(|_| PyValueError::new_err("Blinding must be 31 bytes"))?;

        let mut builder = Utxo::builder(account)
            .assets(assets)
            .amounts(amounts.into_iter().map(i128::from))
            .blinding(blinding)
            .pool_type(pool_type);
        if let Some(index) = index {
            builder = builder.index(index);
        }

        builder
            .build()
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Public spend key and transport key of the account derived from `seed`
    ///
    /// # Returns
    /// * (spend_public, transport_public), 32 bytes each
    #[pyfunction]
    fn account_public(py: Python, seed: &[u8]) -> PyResult<(Py<PyBytes>, Py<PyBytes>)> {
        let account = Account::from_seed(&seed_from_bytes(seed)?);

        Ok((
            PyBytes::new(py, &fr_to_be_bytes(&account.spend_public())).into(),
            PyBytes::new(py, account.transport_public()).into(),
        ))
    }

    /// Commitment of a note owned by the account derived from `seed`
    ///
    /// # Arguments
    /// * `assets` - Base58 asset addresses
    /// * `amounts` - Amount per asset
    /// * `blinding` - 31-byte big-endian blinding factor
    #[pyfunction]
    fn utxo_commitment(
        py: Python,
        seed: &[u8],
        assets: Vec<String>,
        amounts: Vec<u64>,
        blinding: &[u8],
        pool_type: u64,
    ) -> PyResult<Py<PyBytes>> {
        let utxo = build_utxo(seed, assets, amounts, blinding, pool_type, None)?;
        Ok(PyBytes::new(py, &fr_to_be_bytes(&utxo.commitment())).into())
    }

    /// Nullifier of a note at tree position `index`
    #[pyfunction]
    fn utxo_nullifier(
        py: Python,
        seed: &[u8],
        assets: Vec<String>,
        amounts: Vec<u64>,
        blinding: &[u8],
        pool_type: u64,
        index: u64,
    ) -> PyResult<Py<PyBytes>> {
        let utxo = build_utxo(seed, assets, amounts, blinding, pool_type, Some(index))?;
        let nullifier = utxo
            .nullifier()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        Ok(PyBytes::new(py, &fr_to_be_bytes(&nullifier)).into())
    }

    /// Poseidon hash over big-endian field elements
    #[pyfunction]
    fn poseidon_hash(py: Python, inputs: Vec<Vec<u8>>) -> PyResult<Py<PyBytes>> {
        let hash = poseidon_hash_bytes(&inputs)
            .map_err(|e| PyRuntimeError::new_err(format!("Poseidon hash failed: {}", e)))?;

        Ok(PyBytes::new(py, &hash).into())
    }

    #[pymodule]
    fn _shade_core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(account_public, m)?)?;
        m.add_function(wrap_pyfunction!(utxo_commitment, m)?)?;
        m.add_function(wrap_pyfunction!(utxo_nullifier, m)?)?;
        m.add_function(wrap_pyfunction!(poseidon_hash, m)?)?;

        m.add("__version__", env!("CARGO_PKG_VERSION"))?;

        Ok(())
    }
}
