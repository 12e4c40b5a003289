//! Note Encryption using ECDH + ChaCha20-Poly1305
//!
//! This module provides encryption for serialized notes so that recipients
//! can recover their note contents from published ciphertexts.
//!
//! Encryption scheme:
//! 1. Sender generates ephemeral keypair (r, R = r*G) on BN254 G1
//! 2. Shared secret = ECDH(r, recipient_pubkey) = r * recipient_pubkey
//! 3. Derive symmetric key from shared secret using SHA-256
//! 4. Encrypt the plaintext with ChaCha20-Poly1305 under a fresh random nonce
//! 5. Publish R || nonce || ciphertext
//!
//! Decryption:
//! 1. Recipient computes shared secret = ECDH(private_key, R)
//! 2. Derive symmetric key from shared secret
//! 3. Authenticate and decrypt the ciphertext

use ark_bn254::Fr;
use ark_ec::{CurveGroup, Group};
use ark_ff::UniformRand;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::constants::ENCRYPTION_DOMAIN;

/// The curve used for key agreement
type G1 = ark_bn254::G1Projective;
type G1Affine = ark_bn254::G1Affine;

/// Size of a compressed public key
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of the ChaCha20-Poly1305 nonce
pub const NONCE_SIZE: usize = 12;

/// Size of the Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Bytes added on top of the plaintext by `encrypt_note`
pub const ENCRYPTION_OVERHEAD: usize = PUBLIC_KEY_SIZE + NONCE_SIZE + TAG_SIZE;

/// Errors for encryption operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Decryption failed")]
    DecryptionFailed,
    #[error("Invalid ciphertext length: {0} bytes")]
    InvalidCiphertextLength(usize),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Encrypted note structure
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedNote {
    /// Ephemeral public key (R = r*G)
    pub ephemeral_key: [u8; PUBLIC_KEY_SIZE],
    /// Nonce for ChaCha20-Poly1305
    pub nonce: [u8; NONCE_SIZE],
    /// Encrypted data + auth tag
    pub ciphertext: Vec<u8>,
}

impl EncryptedNote {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PUBLIC_KEY_SIZE + NONCE_SIZE + self.ciphertext.len());
        bytes.extend_from_slice(&self.ephemeral_key);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncryptionError> {
        if bytes.len() < ENCRYPTION_OVERHEAD {
            return Err(EncryptionError::InvalidCiphertextLength(bytes.len()));
        }

        let (ephemeral, rest) = bytes.split_at(PUBLIC_KEY_SIZE);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

        let mut ephemeral_key = [0u8; PUBLIC_KEY_SIZE];
        ephemeral_key.copy_from_slice(ephemeral);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);

        Ok(Self {
            ephemeral_key,
            nonce: nonce_bytes,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Encryption keypair
#[derive(Clone)]
pub struct EncryptionKeypair {
    /// Private key (scalar)
    private_key: Fr,
    /// Compressed public key (point)
    public_key: [u8; PUBLIC_KEY_SIZE],
}

impl EncryptionKeypair {
    /// Create from a private scalar
    pub fn from_scalar(private_key: Fr) -> Self {
        let public_key = compress_point(&(G1::generator() * private_key));
        Self {
            private_key,
            public_key,
        }
    }

    /// Get the public key as bytes (compressed)
    pub fn public_key_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public_key
    }
}

impl std::fmt::Debug for EncryptionKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeypair")
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

/// Check that bytes are a valid compressed G1 point
pub fn validate_public_key(bytes: &[u8; PUBLIC_KEY_SIZE]) -> Result<(), EncryptionError> {
    parse_point(bytes).map(|_| ())
}

/// Encrypt a plaintext for a recipient
///
/// # Arguments
/// * `plaintext` - The serialized note
/// * `recipient_pubkey` - The recipient's compressed public key (32 bytes)
///
/// # Returns
/// * `EncryptedNote` containing ephemeral key, nonce and ciphertext
pub fn encrypt_note(
    plaintext: &[u8],
    recipient_pubkey: &[u8; PUBLIC_KEY_SIZE],
) -> Result<EncryptedNote, EncryptionError> {
    let recipient_point = parse_point(recipient_pubkey)?;

    // Generate ephemeral keypair
    let ephemeral_private = Fr::rand(&mut OsRng);
    let ephemeral_key = compress_point(&(G1::generator() * ephemeral_private));

    // Compute shared secret via ECDH
    let shared_secret = recipient_point * ephemeral_private;
    let symmetric_key = derive_symmetric_key(&shared_secret)?;

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new_from_slice(&symmetric_key)
        .map_err(|e| EncryptionError::SerializationError(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| EncryptionError::SerializationError(e.to_string()))?;

    Ok(EncryptedNote {
        ephemeral_key,
        nonce,
        ciphertext,
    })
}

/// Decrypt an encrypted note
///
/// # Arguments
/// * `encrypted_note` - The encrypted note
/// * `keypair` - The recipient's keypair
///
/// # Returns
/// * The plaintext if authentication succeeds
pub fn decrypt_note(
    encrypted_note: &EncryptedNote,
    keypair: &EncryptionKeypair,
) -> Result<Vec<u8>, EncryptionError> {
    let ephemeral_point = parse_point(&encrypted_note.ephemeral_key)?;

    // Compute shared secret via ECDH
    let shared_secret = ephemeral_point * keypair.private_key;
    let symmetric_key = derive_symmetric_key(&shared_secret)?;

    let cipher = ChaCha20Poly1305::new_from_slice(&symmetric_key)
        .map_err(|_| EncryptionError::DecryptionFailed)?;

    cipher
        .decrypt(
            Nonce::from_slice(&encrypted_note.nonce),
            encrypted_note.ciphertext.as_slice(),
        )
        .map_err(|_| EncryptionError::DecryptionFailed)
}

fn parse_point(bytes: &[u8; PUBLIC_KEY_SIZE]) -> Result<G1, EncryptionError> {
    let affine = G1Affine::deserialize_compressed(bytes.as_slice())
        .map_err(|_| EncryptionError::InvalidPublicKey)?;
    Ok(G1::from(affine))
}

fn compress_point(point: &G1) -> [u8; PUBLIC_KEY_SIZE] {
    let mut bytes = [0u8; PUBLIC_KEY_SIZE];
    point
        .into_affine()
        .serialize_compressed(&mut bytes[..])
        .expect("compressed BN254 G1 point is 32 bytes");
    bytes
}

/// Derive a 32-byte symmetric key from an ECDH shared secret
fn derive_symmetric_key(shared_secret: &G1) -> Result<[u8; 32], EncryptionError> {
    let mut point_bytes = Vec::with_capacity(PUBLIC_KEY_SIZE);
    shared_secret
        .into_affine()
        .serialize_compressed(&mut point_bytes)
        .map_err(|e| EncryptionError::SerializationError(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(ENCRYPTION_DOMAIN);
    hasher.update(&point_bytes);
    hasher.update(b"symmetric_key");

    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    Ok(key)
}
