//! Accounts: spend and transport identities
//!
//! An account is derived from a 32-byte seed through a domain-separated
//! SHA-256 chain:
//!
//! ```text
//! spend_scalar     = Fr(SHA256("SHADE_SPEND_KEY_V1"     || seed))
//! spend_public     = Poseidon(spend_scalar)
//! transport_secret = Fr(SHA256("SHADE_TRANSPORT_KEY_V1" || seed))
//! transport_public = transport_secret * G        (BN254 G1, compressed)
//! ```
//!
//! `spend_public` is what notes commit to; `spend_scalar` is needed to derive
//! nullifiers. The transport keypair is used to encrypt notes to the owner.
//! A view-only account carries the two public halves and nothing else.

use ark_bn254::Fr;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::constants::{SPEND_KEY_DOMAIN, TRANSPORT_KEY_DOMAIN};
use crate::crypto::encryption::{validate_public_key, EncryptionKeypair, PUBLIC_KEY_SIZE};
use crate::crypto::field::{derive_field_from_seed, fr_to_hex};
use crate::crypto::poseidon::poseidon_hash;
use crate::error::{UtxoError, UtxoErrorCode};

/// Public components shared by every account
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountPublic {
    spend_public: Fr,
    transport_public: [u8; PUBLIC_KEY_SIZE],
}

impl AccountPublic {
    pub fn spend_public(&self) -> Fr {
        self.spend_public
    }

    pub fn transport_public(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.transport_public
    }
}

/// An account holding private key material
#[derive(Clone)]
pub struct FullAccount {
    public: AccountPublic,
    spend_scalar: Fr,
    transport: EncryptionKeypair,
}

impl FullAccount {
    pub fn public(&self) -> &AccountPublic {
        &self.public
    }

    /// Scalar-bound signature over a commitment and its tree position
    ///
    /// signature = Poseidon(spend_scalar, commitment, index)
    pub fn sign(&self, commitment: &Fr, index: u64) -> Fr {
        poseidon_hash(&[self.spend_scalar, *commitment, Fr::from(index)])
    }

    pub(crate) fn transport_keypair(&self) -> &EncryptionKeypair {
        &self.transport
    }
}

impl std::fmt::Debug for FullAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullAccount")
            .field("spend_public", &fr_to_hex(&self.public.spend_public))
            .field("transport_public", &hex::encode(self.public.transport_public))
            .finish_non_exhaustive()
    }
}

/// A spend/transport identity, either full or view-only
#[derive(Clone, Debug)]
pub enum Account {
    Full(FullAccount),
    ViewOnly(AccountPublic),
}

impl Account {
    /// Deterministically derive a full account from a seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let spend_scalar = derive_field_from_seed(SPEND_KEY_DOMAIN, seed);
        let spend_public = spend_public_from_scalar(&spend_scalar);
        let transport = EncryptionKeypair::from_scalar(derive_field_from_seed(TRANSPORT_KEY_DOMAIN, seed));

        Account::Full(FullAccount {
            public: AccountPublic {
                spend_public,
                transport_public: *transport.public_key_bytes(),
            },
            spend_scalar,
            transport,
        })
    }

    /// Derive a full account from a fresh random seed
    pub fn random() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    /// Build a view-only account from its public components
    pub fn from_pubkey(
        spend_public: Fr,
        transport_public: [u8; PUBLIC_KEY_SIZE],
    ) -> Result<Self, UtxoError> {
        validate_public_key(&transport_public).map_err(|e| {
            UtxoError::new(
                UtxoErrorCode::InvalidPubkey,
                "from_pubkey",
                format!("transport public key {}: {}", hex::encode(transport_public), e),
            )
        })?;

        Ok(Account::ViewOnly(AccountPublic {
            spend_public,
            transport_public,
        }))
    }

    pub fn public(&self) -> &AccountPublic {
        match self {
            Account::Full(full) => &full.public,
            Account::ViewOnly(public) => public,
        }
    }

    pub fn spend_public(&self) -> Fr {
        self.public().spend_public
    }

    pub fn transport_public(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public().transport_public
    }

    /// The full variant, if this account holds private key material
    pub fn as_full(&self) -> Option<&FullAccount> {
        match self {
            Account::Full(full) => Some(full),
            Account::ViewOnly(_) => None,
        }
    }

    pub fn is_view_only(&self) -> bool {
        matches!(self, Account::ViewOnly(_))
    }

    /// A view-only copy of this account
    pub fn to_view_only(&self) -> Self {
        Account::ViewOnly(*self.public())
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.public() == other.public()
    }
}

impl Eq for Account {}

impl From<FullAccount> for Account {
    fn from(full: FullAccount) -> Self {
        Account::Full(full)
    }
}

fn spend_public_from_scalar(spend_scalar: &Fr) -> Fr {
    poseidon_hash(&[*spend_scalar])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_derivation_deterministic() {
        let a = Account::from_seed(&[1u8; 32]);
        let b = Account::from_seed(&[1u8; 32]);

        assert_eq!(a, b);
        assert_eq!(a.transport_public(), b.transport_public());
        assert!(!a.is_view_only());
    }

    #[test]
    fn test_spend_public_vector() {
        let account = Account::from_seed(&[1u8; 32]);
        assert_eq!(
            fr_to_hex(&account.spend_public()),
            "27695b15e97b65cf140ad796b32b992184dc1ca29a2f24cd199dc212818e39e0"
        );
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = Account::from_seed(&[1u8; 32]);
        let b = Account::from_seed(&[2u8; 32]);

        assert_ne!(a.spend_public(), b.spend_public());
        assert_ne!(a.transport_public(), b.transport_public());
    }

    #[test]
    fn test_random_accounts_differ() {
        assert_ne!(Account::random(), Account::random());
    }

    #[test]
    fn test_view_only_from_pubkey() {
        let full = Account::from_seed(&[3u8; 32]);
        let view = Account::from_pubkey(full.spend_public(), *full.transport_public()).unwrap();

        assert!(view.is_view_only());
        assert!(view.as_full().is_none());
        // equality is by public components
        assert_eq!(view, full);
        assert_eq!(full.to_view_only(), view);
    }

    #[test]
    fn test_from_pubkey_rejects_invalid_transport_key() {
        let err = Account::from_pubkey(Fr::from(1u64), [0xffu8; 32]).unwrap_err();
        assert_eq!(err.code(), UtxoErrorCode::InvalidPubkey);
        assert_eq!(err.function_name(), "from_pubkey");
    }

    #[test]
    fn test_sign_binds_scalar_commitment_and_index() {
        let account = Account::from_seed(&[4u8; 32]);
        let other = Account::from_seed(&[5u8; 32]);
        let full = account.as_full().unwrap();
        let commitment = Fr::from(99u64);

        assert_eq!(full.sign(&commitment, 1), full.sign(&commitment, 1));
        assert_ne!(full.sign(&commitment, 1), full.sign(&commitment, 2));
        assert_ne!(full.sign(&commitment, 1), full.sign(&Fr::from(98u64), 1));
        assert_ne!(
            full.sign(&commitment, 1),
            other.as_full().unwrap().sign(&commitment, 1)
        );
    }

    #[test]
    fn test_debug_hides_private_material() {
        let account = Account::from_seed(&[6u8; 32]);
        let debug = format!("{:?}", account);
        assert!(debug.contains("spend_public"));
        assert!(!debug.contains("spend_scalar"));
    }
}
