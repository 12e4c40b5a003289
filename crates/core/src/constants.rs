//! Protocol constants
//!
//! These values are part of the wire and circuit contract with the on-chain
//! verifier. Changing any of them changes every commitment and nullifier.

/// Maximum number of assets a single UTXO can hold
pub const N_ASSETS: usize = 2;

/// Byte width of the blinding factor (fits below the BN254 modulus)
pub const BLINDING_BYTES: usize = 31;

/// Maximum length of the application payload carried by a UTXO
pub const UTXO_APP_DATA_MAX_BYTES: usize = 512;

/// Current version of the `Utxo::to_bytes` layout
pub const UTXO_LAYOUT_VERSION: u8 = 1;

/// Fixed part of the serialized UTXO:
/// version(1) + amounts(16) + blinding(31) + asset indices(16)
/// + instruction type(8) + pool type(8) + verifier(32) + app data len(2)
pub const UTXO_FIXED_BYTES: usize = 1 + 8 * N_ASSETS + BLINDING_BYTES + 8 * N_ASSETS + 8 + 8 + 32 + 2;

/// Domain separator for the spend scalar derived from an account seed
pub const SPEND_KEY_DOMAIN: &[u8] = b"SHADE_SPEND_KEY_V1";

/// Domain separator for the transport secret derived from an account seed
pub const TRANSPORT_KEY_DOMAIN: &[u8] = b"SHADE_TRANSPORT_KEY_V1";

/// Domain separator for note encryption key derivation
pub const ENCRYPTION_DOMAIN: &[u8] = b"SHADE_NOTE_ENCRYPTION_V1";
