//! Poseidon Hash Function
//!
//! A zkSNARK-friendly hash function over the BN254 scalar field, using the
//! circom parameter set (x^5 S-box, 8 full rounds, per-width partial rounds,
//! Grain-generated round constants and MDS matrices) through `light-poseidon`.
//! These are the parameters the on-chain verifier and the circuits use, so
//! every commitment, nullifier and account key in this crate goes through
//! this module.
//!
//! `n` inputs are hashed with a state of width `t = n + 1`, capacity element
//! first. Hashers are built lazily per arity and reused on each thread.

use std::cell::RefCell;

use ark_bn254::Fr;
use ark_ff::PrimeField;
use light_poseidon::{Poseidon, PoseidonHasher, MAX_X5_LEN};
use thiserror::Error;

use super::field::fr_to_be_bytes;

/// Maximum number of field elements accepted by one hash call
pub const POSEIDON_MAX_INPUTS: usize = MAX_X5_LEN - 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoseidonError {
    #[error("Invalid input length: expected at most {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("Empty input")]
    EmptyInput,
    #[error("Hasher error: {0}")]
    Hasher(String),
}

impl From<light_poseidon::PoseidonError> for PoseidonError {
    fn from(e: light_poseidon::PoseidonError) -> Self {
        PoseidonError::Hasher(e.to_string())
    }
}

thread_local! {
    /// One hasher per arity, slot `n - 1` for `n` inputs
    static HASHERS: RefCell<Vec<Option<Poseidon<Fr>>>> =
        RefCell::new((0..POSEIDON_MAX_INPUTS).map(|_| None).collect());
}

/// Hash field elements using Poseidon (1 to `POSEIDON_MAX_INPUTS` inputs)
pub fn poseidon_hash_fields(inputs: &[Fr]) -> Result<Fr, PoseidonError> {
    if inputs.is_empty() {
        return Err(PoseidonError::EmptyInput);
    }

    if inputs.len() > POSEIDON_MAX_INPUTS {
        return Err(PoseidonError::InvalidLength {
            expected: POSEIDON_MAX_INPUTS,
            got: inputs.len(),
        });
    }

    HASHERS.with(|hashers| -> Result<Fr, PoseidonError> {
        let mut hashers = hashers.borrow_mut();
        let slot = &mut hashers[inputs.len() - 1];

        let mut hasher = match slot.take() {
            Some(hasher) => hasher,
            None => Poseidon::<Fr>::new_circom(inputs.len())?,
        };
        let hash = hasher.hash(inputs);
        *slot = Some(hasher);

        Ok(hash?)
    })
}

struct Arity<const N: usize>;

impl<const N: usize> Arity<N> {
    const SUPPORTED: () = assert!(N >= 1 && N <= POSEIDON_MAX_INPUTS, "unsupported Poseidon arity");
}

/// Hash a fixed number of field elements; the arity is checked at compile time
pub fn poseidon_hash<const N: usize>(inputs: &[Fr; N]) -> Fr {
    #[allow(clippy::let_unit_value)]
    let () = Arity::<N>::SUPPORTED;
    poseidon_hash_fields(inputs).expect("arity is within the circom parameter range")
}

/// Poseidon hash for big-endian byte strings of at most 32 bytes each
pub fn poseidon_hash_bytes(inputs: &[Vec<u8>]) -> Result<[u8; 32], PoseidonError> {
    let field_inputs = inputs
        .iter()
        .map(|bytes| {
            if bytes.len() > 32 {
                return Err(PoseidonError::InvalidLength {
                    expected: 32,
                    got: bytes.len(),
                });
            }
            Ok(Fr::from_be_bytes_mod_order(bytes))
        })
        .collect::<Result<Vec<Fr>, _>>()?;

    Ok(fr_to_be_bytes(&poseidon_hash_fields(&field_inputs)?))
}
