//! Field element conversions
//!
//! Identifiers such as asset mints and verifier program addresses are 32 bytes
//! wide and do not fit the BN254 scalar field. They enter the circuit through
//! `hash_and_truncate_to_circuit`: SHA-256 of the identifier with the leading
//! byte dropped, leaving 248 bits that always fit.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use sha2::{Digest, Sha256};

/// Serialize a field element to 32 big-endian bytes
pub fn fr_to_be_bytes(value: &Fr) -> [u8; 32] {
    let mut result = [0u8; 32];
    result.copy_from_slice(&value.into_bigint().to_bytes_be());
    result
}

/// Read a field element from big-endian bytes, reducing modulo the field order
pub fn fr_from_be_bytes(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

/// Hex form (big-endian) of a field element, for logs and test vectors
pub fn fr_to_hex(value: &Fr) -> String {
    hex::encode(fr_to_be_bytes(value))
}

/// Hash arbitrary bytes and truncate the digest to 31 bytes
pub fn hash_and_truncate_to_circuit(bytes: &[u8]) -> Fr {
    let digest = Sha256::digest(bytes);
    Fr::from_be_bytes_mod_order(&digest[1..32])
}

/// Derive a field element from a seed under a domain separator
pub(crate) fn derive_field_from_seed(domain: &[u8], seed: &[u8]) -> Fr {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(seed);
    Fr::from_le_bytes_mod_order(&hasher.finalize())
}
