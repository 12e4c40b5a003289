//! Shielded UTXOs
//!
//! A `Utxo` is a single confidential value record: up to `N_ASSETS` asset
//! amounts owned by an account, hidden behind a Poseidon commitment.
//!
//! ```text
//! commitment = Poseidon(owner, asset_circuit[0], asset_circuit[1],
//!                       amount[0], amount[1], blinding,
//!                       app_data_hash, pool_type, verifier_circuit)
//! signature  = Poseidon(spend_scalar, commitment, index)
//! nullifier  = Poseidon(commitment, index, signature)
//! ```
//!
//! Notes are immutable. The commitment and nullifier are derived on first
//! access and kept in write-once cells.

use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_ff::PrimeField;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, trace, warn};

use crate::account::{Account, FullAccount};
use crate::constants::{BLINDING_BYTES, N_ASSETS, UTXO_FIXED_BYTES, UTXO_LAYOUT_VERSION};
use crate::crypto::encryption::{decrypt_note, encrypt_note, EncryptedNote, EncryptionError};
use crate::crypto::field::{fr_to_be_bytes, fr_to_hex};
use crate::crypto::poseidon::{poseidon_hash, poseidon_hash_fields};
use crate::error::validation::{validate_amount, validate_app_data_len, validate_assets_and_amounts};
use crate::error::{UtxoError, UtxoErrorCode};
use crate::registry::{Address, AssetRegistry, FEE_ASSET};

const FN_BUILD: &str = "build";
const FN_NULLIFIER: &str = "nullifier";
const FN_TO_BYTES: &str = "to_bytes";
const FN_FROM_BYTES: &str = "from_bytes";
const FN_ENCRYPT: &str = "encrypt";

/// Decodes an application payload into the field elements it commits to
pub type AppDataFromBytes = fn(&[u8]) -> Result<Vec<Fr>, UtxoError>;

/// A shielded note
#[derive(Clone, Debug)]
pub struct Utxo {
    assets: [Address; N_ASSETS],
    assets_circuit: [Fr; N_ASSETS],
    amounts: [u64; N_ASSETS],
    account: Account,
    blinding: Fr,
    app_data: Vec<u8>,
    app_data_hash: Fr,
    instruction_type: u64,
    pool_type: u64,
    verifier_address: Address,
    verifier_address_circuit: Fr,
    index: Option<u64>,
    commitment: OnceLock<Fr>,
    nullifier: OnceLock<Fr>,
}

/// Outcome of trying to decrypt a ciphertext with an account
#[derive(Clone, Debug)]
pub enum DecryptedUtxo {
    /// The ciphertext was addressed to the account
    Decoded(Utxo),
    /// The ciphertext belongs to someone else, or is not a note
    NotForMe,
}

impl DecryptedUtxo {
    pub fn into_utxo(self) -> Option<Utxo> {
        match self {
            DecryptedUtxo::Decoded(utxo) => Some(utxo),
            DecryptedUtxo::NotForMe => None,
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, DecryptedUtxo::Decoded(_))
    }
}

/// Validated inputs shared by the builder and the byte decoder
struct UtxoParts {
    assets: [Address; N_ASSETS],
    amounts: [u64; N_ASSETS],
    account: Account,
    blinding: Fr,
    app_data: Vec<u8>,
    app_data_from_bytes: Option<AppDataFromBytes>,
    instruction_type: u64,
    pool_type: u64,
    verifier_address: Address,
    index: Option<u64>,
}

/// Builder for `Utxo`
///
/// Defaults: one fee-asset slot with amount 0, random blinding, no app data,
/// instruction and pool type 0, the default verifier address, no index.
#[derive(Clone)]
pub struct UtxoBuilder {
    account: Account,
    assets: Vec<Address>,
    amounts: Vec<i128>,
    blinding: Option<[u8; BLINDING_BYTES]>,
    app_data: Vec<u8>,
    app_data_from_bytes: Option<AppDataFromBytes>,
    instruction_type: u64,
    pool_type: u64,
    verifier_address: Address,
    index: Option<u64>,
}

impl UtxoBuilder {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            assets: vec![FEE_ASSET],
            amounts: vec![0],
            blinding: None,
            app_data: Vec::new(),
            app_data_from_bytes: None,
            instruction_type: 0,
            pool_type: 0,
            verifier_address: Address::default(),
            index: None,
        }
    }

    pub fn assets(mut self, assets: impl IntoIterator<Item = Address>) -> Self {
        self.assets = assets.into_iter().collect();
        self
    }

    pub fn amounts(mut self, amounts: impl IntoIterator<Item = i128>) -> Self {
        self.amounts = amounts.into_iter().collect();
        self
    }

    /// Fix the blinding factor (big-endian); omit for a fresh random one
    pub fn blinding(mut self, blinding: [u8; BLINDING_BYTES]) -> Self {
        self.blinding = Some(blinding);
        self
    }

    pub fn app_data(mut self, app_data: Vec<u8>) -> Self {
        self.app_data = app_data;
        self
    }

    pub fn app_data_from_bytes(mut self, decode: AppDataFromBytes) -> Self {
        self.app_data_from_bytes = Some(decode);
        self
    }

    pub fn instruction_type(mut self, instruction_type: u64) -> Self {
        self.instruction_type = instruction_type;
        self
    }

    pub fn pool_type(mut self, pool_type: u64) -> Self {
        self.pool_type = pool_type;
        self
    }

    pub fn verifier_address(mut self, verifier_address: Address) -> Self {
        self.verifier_address = verifier_address;
        self
    }

    pub fn index(mut self, index: u64) -> Self {
        self.index = Some(index);
        self
    }

    /// Validate the inputs and build the note
    pub fn build(self) -> Result<Utxo, UtxoError> {
        validate_assets_and_amounts(self.assets.len(), self.amounts.len())?;

        let mut amounts = [0u64; N_ASSETS];
        for (i, amount) in self.amounts.iter().enumerate() {
            amounts[i] = validate_amount(i, *amount)?;
        }

        // Unused slots hold the fee asset with amount 0
        let mut assets = [FEE_ASSET; N_ASSETS];
        assets[..self.assets.len()].copy_from_slice(&self.assets);

        let blinding = match self.blinding {
            Some(bytes) => Fr::from_be_bytes_mod_order(&bytes),
            None => random_blinding(),
        };

        Utxo::assemble(
            UtxoParts {
                assets,
                amounts,
                account: self.account,
                blinding,
                app_data: self.app_data,
                app_data_from_bytes: self.app_data_from_bytes,
                instruction_type: self.instruction_type,
                pool_type: self.pool_type,
                verifier_address: self.verifier_address,
                index: self.index,
            },
            FN_BUILD,
        )
    }
}

impl Utxo {
    pub fn builder(account: Account) -> UtxoBuilder {
        UtxoBuilder::new(account)
    }

    fn assemble(parts: UtxoParts, function_name: &'static str) -> Result<Self, UtxoError> {
        let app_data_hash = hash_app_data(function_name, &parts.app_data, parts.app_data_from_bytes)?;

        let utxo = Self {
            assets_circuit: assets_circuit(&parts.assets),
            assets: parts.assets,
            amounts: parts.amounts,
            account: parts.account,
            blinding: parts.blinding,
            app_data: parts.app_data,
            app_data_hash,
            instruction_type: parts.instruction_type,
            pool_type: parts.pool_type,
            verifier_address_circuit: verifier_circuit(&parts.verifier_address),
            verifier_address: parts.verifier_address,
            index: parts.index,
            commitment: OnceLock::new(),
            nullifier: OnceLock::new(),
        };

        debug!(
            function = function_name,
            assets = ?utxo.assets,
            pool_type = utxo.pool_type,
            index = ?utxo.index,
            view_only = utxo.account.is_view_only(),
            "utxo constructed"
        );

        Ok(utxo)
    }

    /// The same note placed at a tree position
    pub fn with_index(&self, index: u64) -> Self {
        let mut utxo = self.clone();
        utxo.index = Some(index);
        utxo.nullifier = OnceLock::new();
        utxo
    }

    pub fn assets(&self) -> &[Address; N_ASSETS] {
        &self.assets
    }

    pub fn assets_circuit(&self) -> &[Fr; N_ASSETS] {
        &self.assets_circuit
    }

    pub fn amounts(&self) -> &[u64; N_ASSETS] {
        &self.amounts
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn blinding(&self) -> Fr {
        self.blinding
    }

    /// Blinding factor in its 31-byte big-endian wire form
    pub fn blinding_bytes(&self) -> [u8; BLINDING_BYTES] {
        let full = fr_to_be_bytes(&self.blinding);
        let mut bytes = [0u8; BLINDING_BYTES];
        bytes.copy_from_slice(&full[32 - BLINDING_BYTES..]);
        bytes
    }

    pub fn app_data(&self) -> &[u8] {
        &self.app_data
    }

    pub fn app_data_hash(&self) -> Fr {
        self.app_data_hash
    }

    pub fn instruction_type(&self) -> u64 {
        self.instruction_type
    }

    pub fn pool_type(&self) -> u64 {
        self.pool_type
    }

    pub fn verifier_address(&self) -> &Address {
        &self.verifier_address
    }

    pub fn verifier_address_circuit(&self) -> Fr {
        self.verifier_address_circuit
    }

    pub fn index(&self) -> Option<u64> {
        self.index
    }

    /// Note commitment; independent of the tree position
    pub fn commitment(&self) -> Fr {
        *self.commitment.get_or_init(|| {
            let commitment = poseidon_hash(&[
                self.account.spend_public(),
                self.assets_circuit[0],
                self.assets_circuit[1],
                Fr::from(self.amounts[0]),
                Fr::from(self.amounts[1]),
                self.blinding,
                self.app_data_hash,
                Fr::from(self.pool_type),
                self.verifier_address_circuit,
            ]);
            trace!(commitment = %fr_to_hex(&commitment), "computed utxo commitment");
            commitment
        })
    }

    /// Nullifier revealed when the note is spent
    ///
    /// Requires the tree position and an account holding the spend scalar.
    pub fn nullifier(&self) -> Result<Fr, UtxoError> {
        let index = self.index.ok_or_else(|| {
            UtxoError::new(
                UtxoErrorCode::IndexNotProvided,
                FN_NULLIFIER,
                "utxo index is required to derive the nullifier",
            )
        })?;

        let account = self.account.as_full().ok_or_else(|| {
            UtxoError::new(
                UtxoErrorCode::AccountHasNoPrivkey,
                FN_NULLIFIER,
                "view-only account cannot derive nullifiers",
            )
        })?;

        Ok(*self.nullifier.get_or_init(|| {
            let commitment = self.commitment();
            let signature = account.sign(&commitment, index);
            let nullifier = poseidon_hash(&[commitment, Fr::from(index), signature]);
            trace!(index, nullifier = %fr_to_hex(&nullifier), "computed utxo nullifier");
            nullifier
        }))
    }

    /// Serialize to the fixed wire layout (see `constants::UTXO_FIXED_BYTES`)
    pub fn to_bytes(&self, registry: &dyn AssetRegistry) -> Result<Vec<u8>, UtxoError> {
        let mut indices = [0u64; N_ASSETS];
        for (slot, asset) in self.assets.iter().enumerate() {
            let entry = registry.lookup(asset).ok_or_else(|| {
                UtxoError::new(
                    UtxoErrorCode::AssetNotFound,
                    FN_TO_BYTES,
                    format!("asset {} (assets[{}]) not found in registry", asset, slot),
                )
            })?;
            indices[slot] = entry.index;
        }

        let mut bytes = Vec::with_capacity(UTXO_FIXED_BYTES + self.app_data.len());
        bytes.push(UTXO_LAYOUT_VERSION);
        for amount in &self.amounts {
            bytes.extend_from_slice(&amount.to_le_bytes());
        }
        bytes.extend_from_slice(&self.blinding_bytes());
        for index in &indices {
            bytes.extend_from_slice(&index.to_le_bytes());
        }
        bytes.extend_from_slice(&self.instruction_type.to_le_bytes());
        bytes.extend_from_slice(&self.pool_type.to_le_bytes());
        bytes.extend_from_slice(self.verifier_address.as_bytes());
        // Length fits: app data is bounded by UTXO_APP_DATA_MAX_BYTES at construction
        bytes.extend_from_slice(&(self.app_data.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&self.app_data);

        Ok(bytes)
    }

    /// Decode a note produced by `to_bytes`, binding it to `account`
    pub fn from_bytes(
        bytes: &[u8],
        account: Account,
        index: Option<u64>,
        registry: &dyn AssetRegistry,
        app_data_from_bytes: Option<AppDataFromBytes>,
    ) -> Result<Self, UtxoError> {
        let mut reader = ByteReader::new(bytes);

        let version = reader.u8()?;
        if version != UTXO_LAYOUT_VERSION {
            return Err(invalid_bytes(format!(
                "unsupported utxo layout version {}, expected {}",
                version, UTXO_LAYOUT_VERSION
            )));
        }

        let mut amounts = [0u64; N_ASSETS];
        for amount in amounts.iter_mut() {
            *amount = reader.u64()?;
        }

        let blinding = Fr::from_be_bytes_mod_order(&reader.array::<BLINDING_BYTES>()?);

        let mut assets = [FEE_ASSET; N_ASSETS];
        for (slot, asset) in assets.iter_mut().enumerate() {
            let registry_index = reader.u64()?;
            *asset = registry.asset_at(registry_index).ok_or_else(|| {
                UtxoError::new(
                    UtxoErrorCode::AssetNotFound,
                    FN_FROM_BYTES,
                    format!("no asset at registry index {} (assets[{}])", registry_index, slot),
                )
            })?;
        }

        let instruction_type = reader.u64()?;
        let pool_type = reader.u64()?;
        let verifier_address = Address::new(reader.array::<32>()?);

        let app_data_len = reader.u16()? as usize;
        let app_data = reader.take(app_data_len)?.to_vec();

        if !reader.is_empty() {
            return Err(invalid_bytes(format!(
                "{} trailing bytes after utxo",
                reader.remaining()
            )));
        }

        Self::assemble(
            UtxoParts {
                assets,
                amounts,
                account,
                blinding,
                app_data,
                app_data_from_bytes,
                instruction_type,
                pool_type,
                verifier_address,
                index,
            },
            FN_FROM_BYTES,
        )
    }

    /// Encrypt the serialized note to the owner's transport key
    ///
    /// Output: ephemeral key (32) || nonce (12) || ciphertext || tag (16)
    pub fn encrypt(&self, registry: &dyn AssetRegistry) -> Result<Vec<u8>, UtxoError> {
        let plaintext = self.to_bytes(registry)?;

        let encrypted = encrypt_note(&plaintext, self.account.transport_public()).map_err(|e| {
            let code = match e {
                EncryptionError::InvalidPublicKey => UtxoErrorCode::InvalidPubkey,
                _ => UtxoErrorCode::EncryptionFailed,
            };
            UtxoError::new(code, FN_ENCRYPT, e.to_string())
        })?;

        Ok(encrypted.to_bytes())
    }

    /// Try to decrypt a ciphertext with `account`'s transport key
    ///
    /// A ciphertext for another account is the common case while scanning and
    /// yields `NotForMe`, as does anything that fails to authenticate or parse.
    pub fn decrypt(
        enc_bytes: &[u8],
        account: &FullAccount,
        index: Option<u64>,
        registry: &dyn AssetRegistry,
        app_data_from_bytes: Option<AppDataFromBytes>,
    ) -> DecryptedUtxo {
        let encrypted = match EncryptedNote::from_bytes(enc_bytes) {
            Ok(encrypted) => encrypted,
            Err(e) => {
                debug!(error = %e, "malformed utxo ciphertext");
                return DecryptedUtxo::NotForMe;
            }
        };

        let plaintext = match decrypt_note(&encrypted, account.transport_keypair()) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                debug!(error = %e, "utxo ciphertext not addressed to account");
                return DecryptedUtxo::NotForMe;
            }
        };

        match Self::from_bytes(
            &plaintext,
            Account::Full(account.clone()),
            index,
            registry,
            app_data_from_bytes,
        ) {
            Ok(utxo) => DecryptedUtxo::Decoded(utxo),
            Err(e) => {
                warn!(error = %e, "authenticated utxo plaintext failed to decode");
                DecryptedUtxo::NotForMe
            }
        }
    }

    /// Decrypt every ciphertext addressed to `account`
    ///
    /// Each item pairs a ciphertext with the tree position of its commitment.
    pub fn scan<I, B>(
        ciphertexts: I,
        account: &FullAccount,
        registry: &dyn AssetRegistry,
        app_data_from_bytes: Option<AppDataFromBytes>,
    ) -> Vec<Utxo>
    where
        I: IntoIterator<Item = (B, u64)>,
        B: AsRef<[u8]>,
    {
        let found: Vec<Utxo> = ciphertexts
            .into_iter()
            .filter_map(|(enc_bytes, index)| {
                Self::decrypt(
                    enc_bytes.as_ref(),
                    account,
                    Some(index),
                    registry,
                    app_data_from_bytes,
                )
                .into_utxo()
            })
            .collect();

        debug!(found = found.len(), "scanned utxo ciphertexts");
        found
    }
}

impl PartialEq for Utxo {
    fn eq(&self, other: &Self) -> bool {
        self.assets == other.assets
            && self.assets_circuit == other.assets_circuit
            && self.amounts == other.amounts
            && self.account == other.account
            && self.blinding == other.blinding
            && self.app_data == other.app_data
            && self.app_data_hash == other.app_data_hash
            && self.instruction_type == other.instruction_type
            && self.pool_type == other.pool_type
            && self.verifier_address == other.verifier_address
            && self.verifier_address_circuit == other.verifier_address_circuit
            && self.index == other.index
            && self.commitment() == other.commitment()
    }
}

impl Eq for Utxo {}

/// Circuit form of each asset slot; padding slots after the first are zero
fn assets_circuit(assets: &[Address; N_ASSETS]) -> [Fr; N_ASSETS] {
    let mut circuit = [Fr::from(0u64); N_ASSETS];
    for (slot, asset) in assets.iter().enumerate() {
        if slot == 0 || !asset.is_default() {
            circuit[slot] = asset.to_circuit();
        }
    }
    circuit
}

fn verifier_circuit(verifier_address: &Address) -> Fr {
    if verifier_address.is_default() {
        Fr::from(0u64)
    } else {
        verifier_address.to_circuit()
    }
}

fn hash_app_data(
    function_name: &'static str,
    app_data: &[u8],
    app_data_from_bytes: Option<AppDataFromBytes>,
) -> Result<Fr, UtxoError> {
    if app_data.is_empty() {
        return Ok(Fr::from(0u64));
    }

    validate_app_data_len(function_name, app_data.len())?;

    let decode = app_data_from_bytes.ok_or_else(|| {
        UtxoError::new(
            UtxoErrorCode::AppDataFromBytesFunctionUndefined,
            function_name,
            "No app_data_from_bytes function provided",
        )
    })?;

    let fields = decode(app_data)?;
    poseidon_hash_fields(&fields).map_err(|e| {
        UtxoError::new(
            UtxoErrorCode::InvalidAppData,
            function_name,
            format!("app data cannot be hashed: {}", e),
        )
    })
}

fn random_blinding() -> Fr {
    let mut bytes = [0u8; BLINDING_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Fr::from_be_bytes_mod_order(&bytes)
}

fn invalid_bytes(message: String) -> UtxoError {
    UtxoError::new(UtxoErrorCode::InvalidBytes, FN_FROM_BYTES, message)
}

/// Bounds-checked cursor over a serialized note
struct ByteReader<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], UtxoError> {
        if self.bytes.len() < len {
            return Err(invalid_bytes(format!(
                "unexpected end of utxo bytes: need {}, have {}",
                len,
                self.bytes.len()
            )));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], UtxoError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, UtxoError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, UtxoError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, UtxoError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn remaining(&self) -> usize {
        self.bytes.len()
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::poseidon::POSEIDON_MAX_INPUTS;
    use crate::registry::{StaticAssetRegistry, MINT};

    const SEED: [u8; 32] = [1u8; 32];
    const BLINDING: [u8; BLINDING_BYTES] = [2u8; BLINDING_BYTES];

    fn account() -> Account {
        Account::from_seed(&SEED)
    }

    fn view_only() -> Account {
        account().to_view_only()
    }

    fn two_asset_builder() -> UtxoBuilder {
        Utxo::builder(account())
            .assets([FEE_ASSET, MINT])
            .amounts([1, 2])
            .blinding(BLINDING)
    }

    /// App data made of little-endian u64 words
    fn decode_words(bytes: &[u8]) -> Result<Vec<Fr>, UtxoError> {
        if bytes.len() % 8 != 0 {
            return Err(UtxoError::new(
                UtxoErrorCode::InvalidAppData,
                "decode_words",
                "app data must be whole u64 words",
            ));
        }
        Ok(bytes
            .chunks(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                Fr::from(u64::from_le_bytes(word))
            })
            .collect())
    }

    #[test]
    fn test_build_two_assets() {
        let utxo = two_asset_builder().index(1).build().unwrap();

        assert_eq!(utxo.amounts(), &[1, 2]);
        assert_eq!(utxo.assets(), &[FEE_ASSET, MINT]);
        assert_eq!(utxo.assets_circuit()[0], FEE_ASSET.to_circuit());
        assert_eq!(utxo.assets_circuit()[1], MINT.to_circuit());
        assert_eq!(utxo.instruction_type(), 0);
        assert_eq!(utxo.pool_type(), 0);
        assert_eq!(utxo.verifier_address().to_string(), "11111111111111111111111111111111");
        assert_eq!(utxo.verifier_address_circuit(), Fr::from(0u64));
        assert_eq!(utxo.app_data_hash(), Fr::from(0u64));
        assert_eq!(utxo.blinding_bytes(), BLINDING);
        assert_eq!(utxo.index(), Some(1));
    }

    #[test]
    fn test_build_pads_to_n_assets() {
        let utxo = Utxo::builder(account()).amounts([5]).build().unwrap();

        assert_eq!(utxo.assets(), &[FEE_ASSET, FEE_ASSET]);
        assert_eq!(utxo.amounts(), &[5, 0]);
        // padding slot is committed as zero, the fee slot is not
        assert_eq!(utxo.assets_circuit()[0], FEE_ASSET.to_circuit());
        assert_eq!(utxo.assets_circuit()[1], Fr::from(0u64));
    }

    #[test]
    fn test_length_mismatch() {
        let err = Utxo::builder(account())
            .assets([MINT])
            .amounts([1, 2])
            .blinding(BLINDING)
            .build()
            .unwrap_err();

        assert_eq!(err.code(), UtxoErrorCode::InvalidAssetOrAmountsLength);
        assert_eq!(err.message(), "Length missmatch assets: 1 != amounts: 2");
        assert_eq!(err.function_name(), "build");
    }

    #[test]
    fn test_exceeded_max_assets() {
        let err = Utxo::builder(account())
            .assets([MINT, MINT, MINT])
            .amounts([1, 1, 1])
            .blinding(BLINDING)
            .build()
            .unwrap_err();

        assert_eq!(err.code(), UtxoErrorCode::ExceededMaxAssets);
        assert_eq!(err.message(), "assets.length 3 > N_ASSETS 2");
    }

    #[test]
    fn test_negative_amount() {
        let err = two_asset_builder().amounts([1, -1]).build().unwrap_err();

        assert_eq!(err.code(), UtxoErrorCode::NegativeAmount);
        assert_eq!(err.message(), "amount cannot be negative, amounts[1] = -1");
    }

    #[test]
    fn test_amount_overflow() {
        let err = two_asset_builder()
            .amounts([u64::MAX as i128 + 1, 0])
            .build()
            .unwrap_err();
        assert_eq!(err.code(), UtxoErrorCode::AmountOverflow);
    }

    #[test]
    fn test_app_data_without_decoder() {
        let err = two_asset_builder().app_data(vec![1u8; 32]).build().unwrap_err();

        assert_eq!(err.code(), UtxoErrorCode::AppDataFromBytesFunctionUndefined);
        assert_eq!(err.function_name(), "build");
    }

    #[test]
    fn test_app_data_hash() {
        let data: Vec<u8> = [7u64, 9u64].iter().flat_map(|w| w.to_le_bytes()).collect();
        let utxo = two_asset_builder()
            .app_data(data)
            .app_data_from_bytes(decode_words)
            .build()
            .unwrap();

        let expected = poseidon_hash_fields(&[Fr::from(7u64), Fr::from(9u64)]).unwrap();
        assert_eq!(utxo.app_data_hash(), expected);
        assert_eq!(
            fr_to_hex(&utxo.app_data_hash()),
            "2f447495cd13dfa223b07ada1d51ac114901e15056a30f8bf28f6fbb4a27376a"
        );

        let plain = two_asset_builder().build().unwrap();
        assert_ne!(utxo.commitment(), plain.commitment());
    }

    #[test]
    fn test_app_data_decoder_errors_propagate() {
        let err = two_asset_builder()
            .app_data(vec![1u8; 3])
            .app_data_from_bytes(decode_words)
            .build()
            .unwrap_err();
        assert_eq!(err.code(), UtxoErrorCode::InvalidAppData);

        // one word more than a single Poseidon call accepts
        let err = two_asset_builder()
            .app_data(vec![0u8; 8 * (POSEIDON_MAX_INPUTS + 1)])
            .app_data_from_bytes(decode_words)
            .build()
            .unwrap_err();
        assert_eq!(err.code(), UtxoErrorCode::InvalidAppData);

        let err = two_asset_builder()
            .app_data(vec![0u8; 520])
            .app_data_from_bytes(decode_words)
            .build()
            .unwrap_err();
        assert_eq!(err.code(), UtxoErrorCode::InvalidAppData);
    }

    #[test]
    fn test_random_blinding_differs() {
        let a = Utxo::builder(account()).amounts([1]).build().unwrap();
        let b = Utxo::builder(account()).amounts([1]).build().unwrap();

        assert_ne!(a.blinding(), b.blinding());
        assert_ne!(a.commitment(), b.commitment());
        assert_ne!(a, b);
    }

    #[test]
    fn test_commitment_deterministic_and_index_independent() {
        let a = two_asset_builder().build().unwrap();
        let b = two_asset_builder().index(7).build().unwrap();

        assert_eq!(a.commitment(), a.commitment());
        assert_eq!(a.commitment(), b.commitment());
        assert_eq!(a.commitment(), a.with_index(3).commitment());
    }

    #[test]
    fn test_commitment_binds_fields() {
        let base = two_asset_builder().build().unwrap().commitment();

        let amounts = two_asset_builder().amounts([1, 3]).build().unwrap();
        let pool = two_asset_builder().pool_type(1).build().unwrap();
        let verifier = two_asset_builder()
            .verifier_address(Address::new([9u8; 32]))
            .build()
            .unwrap();
        let owner = Utxo::builder(Account::from_seed(&[2u8; 32]))
            .assets([FEE_ASSET, MINT])
            .amounts([1, 2])
            .blinding(BLINDING)
            .build()
            .unwrap();

        for other in [amounts, pool, verifier, owner] {
            assert_ne!(other.commitment(), base);
        }

        // instruction type is carried but not committed
        let instruction = two_asset_builder().instruction_type(4).build().unwrap();
        assert_eq!(instruction.commitment(), base);
    }

    #[test]
    fn test_nullifier_requires_index() {
        let err = Utxo::builder(view_only()).amounts([1]).build().unwrap().nullifier().unwrap_err();

        assert_eq!(err.code(), UtxoErrorCode::IndexNotProvided);
        assert_eq!(err.function_name(), "nullifier");
    }

    #[test]
    fn test_nullifier_requires_private_key() {
        let err = Utxo::builder(view_only())
            .amounts([1])
            .index(1)
            .build()
            .unwrap()
            .nullifier()
            .unwrap_err();

        assert_eq!(err.code(), UtxoErrorCode::AccountHasNoPrivkey);
        assert_eq!(err.function_name(), "nullifier");
    }

    #[test]
    fn test_nullifier_deterministic_per_index() {
        let utxo = two_asset_builder().index(1).build().unwrap();

        let n1 = utxo.nullifier().unwrap();
        assert_eq!(n1, utxo.nullifier().unwrap());
        assert_eq!(n1, two_asset_builder().index(1).build().unwrap().nullifier().unwrap());
        assert_ne!(n1, utxo.with_index(2).nullifier().unwrap());
    }

    #[test]
    fn test_view_only_commitment_matches_full() {
        let full = two_asset_builder().build().unwrap();
        let view = Utxo::builder(view_only())
            .assets([FEE_ASSET, MINT])
            .amounts([1, 2])
            .blinding(BLINDING)
            .build()
            .unwrap();

        assert_eq!(full.commitment(), view.commitment());
    }

    #[test]
    fn test_to_bytes_layout() {
        let registry = StaticAssetRegistry::default();
        let utxo = two_asset_builder()
            .instruction_type(3)
            .pool_type(4)
            .build()
            .unwrap();

        let bytes = utxo.to_bytes(&registry).unwrap();
        assert_eq!(bytes.len(), UTXO_FIXED_BYTES);
        assert_eq!(bytes[0], UTXO_LAYOUT_VERSION);
        assert_eq!(&bytes[1..9], &1u64.to_le_bytes());
        assert_eq!(&bytes[9..17], &2u64.to_le_bytes());
        assert_eq!(&bytes[17..48], &BLINDING);
        assert_eq!(&bytes[48..56], &0u64.to_le_bytes());
        assert_eq!(&bytes[56..64], &1u64.to_le_bytes());
        assert_eq!(&bytes[64..72], &3u64.to_le_bytes());
        assert_eq!(&bytes[72..80], &4u64.to_le_bytes());
        assert_eq!(&bytes[80..112], &[0u8; 32]);
        assert_eq!(&bytes[112..114], &[0u8, 0u8]);
    }

    #[test]
    fn test_to_bytes_unknown_asset() {
        let registry = StaticAssetRegistry::default();
        let err = two_asset_builder()
            .assets([FEE_ASSET, Address::new([5u8; 32])])
            .build()
            .unwrap()
            .to_bytes(&registry)
            .unwrap_err();

        assert_eq!(err.code(), UtxoErrorCode::AssetNotFound);
        assert_eq!(err.function_name(), "to_bytes");
    }

    #[test]
    fn test_bytes_roundtrip_with_app_data() {
        let registry = StaticAssetRegistry::default();
        let utxo = two_asset_builder()
            .app_data(42u64.to_le_bytes().to_vec())
            .app_data_from_bytes(decode_words)
            .verifier_address(Address::new([3u8; 32]))
            .pool_type(2)
            .index(5)
            .build()
            .unwrap();

        let bytes = utxo.to_bytes(&registry).unwrap();
        assert_eq!(bytes.len(), UTXO_FIXED_BYTES + 8);

        let decoded = Utxo::from_bytes(&bytes, account(), Some(5), &registry, Some(decode_words)).unwrap();
        assert_eq!(decoded, utxo);
        assert_eq!(decoded.nullifier().unwrap(), utxo.nullifier().unwrap());

        let err = Utxo::from_bytes(&bytes, account(), Some(5), &registry, None).unwrap_err();
        assert_eq!(err.code(), UtxoErrorCode::AppDataFromBytesFunctionUndefined);
        assert_eq!(err.function_name(), "from_bytes");
    }

    #[test]
    fn test_from_bytes_rejects_malformed_input() {
        let registry = StaticAssetRegistry::default();
        let bytes = two_asset_builder().build().unwrap().to_bytes(&registry).unwrap();

        let short = Utxo::from_bytes(&bytes[..50], account(), None, &registry, None).unwrap_err();
        assert_eq!(short.code(), UtxoErrorCode::InvalidBytes);

        let mut trailing = bytes.clone();
        trailing.push(0);
        let err = Utxo::from_bytes(&trailing, account(), None, &registry, None).unwrap_err();
        assert_eq!(err.code(), UtxoErrorCode::InvalidBytes);

        let mut version = bytes.clone();
        version[0] = 2;
        let err = Utxo::from_bytes(&version, account(), None, &registry, None).unwrap_err();
        assert_eq!(err.code(), UtxoErrorCode::InvalidBytes);

        let mut unknown = bytes;
        unknown[56] = 9;
        let err = Utxo::from_bytes(&unknown, account(), None, &registry, None).unwrap_err();
        assert_eq!(err.code(), UtxoErrorCode::AssetNotFound);
        assert_eq!(err.function_name(), "from_bytes");
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let registry = StaticAssetRegistry::default();
        let owner = account();
        let utxo = two_asset_builder().index(1).build().unwrap();

        let enc = utxo.encrypt(&registry).unwrap();
        let decrypted = Utxo::decrypt(&enc, owner.as_full().unwrap(), Some(1), &registry, None);

        assert_eq!(decrypted.into_utxo(), Some(utxo));
    }

    #[test]
    fn test_decrypt_for_other_account_is_not_for_me() {
        let registry = StaticAssetRegistry::default();
        let utxo = two_asset_builder().build().unwrap();
        let enc = utxo.encrypt(&registry).unwrap();

        let stranger = Account::from_seed(&[8u8; 32]);
        let result = Utxo::decrypt(&enc, stranger.as_full().unwrap(), Some(0), &registry, None);
        assert!(!result.is_decoded());

        let garbage = Utxo::decrypt(&[1u8; 10], stranger.as_full().unwrap(), None, &registry, None);
        assert!(!garbage.is_decoded());
    }

    #[test]
    fn test_view_only_owner_can_receive_encrypted_note() {
        let registry = StaticAssetRegistry::default();
        let owner = account();
        let sent = Utxo::builder(view_only())
            .assets([FEE_ASSET, MINT])
            .amounts([1, 2])
            .blinding(BLINDING)
            .build()
            .unwrap();

        let enc = sent.encrypt(&registry).unwrap();
        let received = Utxo::decrypt(&enc, owner.as_full().unwrap(), Some(4), &registry, None)
            .into_utxo()
            .unwrap();

        assert_eq!(received.commitment(), sent.commitment());
        assert!(received.nullifier().is_ok());
    }
}
