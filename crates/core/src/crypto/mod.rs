//! Cryptographic primitives for confidential notes

pub mod encryption;
pub mod field;
pub mod poseidon;

pub use encryption::{decrypt_note, encrypt_note, EncryptedNote, EncryptionError, EncryptionKeypair};
pub use field::{fr_from_be_bytes, fr_to_be_bytes, fr_to_hex, hash_and_truncate_to_circuit};
pub use poseidon::{poseidon_hash, poseidon_hash_bytes, poseidon_hash_fields, PoseidonError, POSEIDON_MAX_INPUTS};
