//! Asset registry
//!
//! Notes reference assets by 32-byte addresses (token mints). On the wire a
//! note only carries the asset's position in the registry, and inside the
//! circuit the asset is represented by its truncated hash. The registry is an
//! explicit dependency so deployments and tests can supply their own allowlist.

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::crypto::field::hash_and_truncate_to_circuit;
use crate::error::{ShadeError, ShadeResult};

/// A 32-byte account address (asset mint, verifier program)
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The all-zero address (system program)
    pub fn is_default(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Circuit representation of this address
    pub fn to_circuit(&self) -> Fr {
        hash_and_truncate_to_circuit(&self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = ShadeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| ShadeError::InvalidInput(format!("invalid base58 address {}: {}", s, e)))?;

        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            ShadeError::InvalidInput(format!("address {} decodes to {} bytes, expected 32", s, b.len()))
        })?;

        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Native fee asset, the system program address `11111111111111111111111111111111`
pub const FEE_ASSET: Address = Address::new([0u8; 32]);

/// Default token mint, `ycrF6Bw3doNPMSDmZM1rxNHimD2bwq1UFmifMCzbjAe`
pub const MINT: Address = Address::new([
    14, 129, 15, 86, 229, 176, 155, 3, 8, 217, 125, 97, 221, 115, 252, 160, 127, 236, 37, 229,
    116, 84, 111, 6, 5, 182, 141, 86, 7, 23, 246, 215,
]);

/// A resolved registry entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Position of the asset in the registry (serialized in place of the address)
    pub index: u64,
    /// Truncated field representation used inside the hash
    pub circuit: Fr,
}

/// Lookup interface over the recognized assets
pub trait AssetRegistry {
    /// Resolve an asset address; `None` if it is not registered
    fn lookup(&self, asset: &Address) -> Option<RegistryEntry>;

    /// The asset registered at `index`
    fn asset_at(&self, index: u64) -> Option<Address>;
}

/// Fixed, ordered allowlist of assets
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticAssetRegistry {
    assets: Vec<Address>,
}

/// JSON layout accepted by `StaticAssetRegistry::from_json`
#[derive(Debug, Serialize, Deserialize)]
struct RegistryConfig {
    assets: Vec<Address>,
}

impl Default for StaticAssetRegistry {
    fn default() -> Self {
        Self {
            assets: vec![FEE_ASSET, MINT],
        }
    }
}

impl StaticAssetRegistry {
    /// Build a registry from an ordered list of distinct assets
    pub fn new(assets: Vec<Address>) -> ShadeResult<Self> {
        if assets.is_empty() {
            return Err(ShadeError::Configuration(
                "asset registry must contain at least one asset".to_string(),
            ));
        }

        for (i, asset) in assets.iter().enumerate() {
            if assets[..i].contains(asset) {
                return Err(ShadeError::Configuration(format!(
                    "duplicate asset {} at registry index {}",
                    asset, i
                )));
            }
        }

        Ok(Self { assets })
    }

    /// Load a registry from `{"assets": ["<base58>", ...]}`
    pub fn from_json(json: &str) -> ShadeResult<Self> {
        let config: RegistryConfig = serde_json::from_str(json)
            .map_err(|e| ShadeError::Configuration(format!("invalid registry json: {}", e)))?;

        let registry = Self::new(config.assets)?;
        debug!(assets = registry.assets.len(), "loaded asset registry");
        Ok(registry)
    }

    /// Serialize the registry back to its JSON form
    pub fn to_json(&self) -> ShadeResult<String> {
        serde_json::to_string(&RegistryConfig {
            assets: self.assets.clone(),
        })
        .map_err(|e| ShadeError::Serialization(e.to_string()))
    }

    pub fn assets(&self) -> &[Address] {
        &self.assets
    }
}

impl AssetRegistry for StaticAssetRegistry {
    fn lookup(&self, asset: &Address) -> Option<RegistryEntry> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|index| RegistryEntry {
                index: index as u64,
                circuit: asset.to_circuit(),
            })
    }

    fn asset_at(&self, index: u64) -> Option<Address> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.assets.get(i))
            .copied()
    }
}
