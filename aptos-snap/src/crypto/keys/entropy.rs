//! Host entropy boundary
//!
//! The host owns the wallet seed and hands out the extended key for a fixed
//! root path on request. `SeedEntropy` is the mnemonic-backed implementation
//! used by the standalone host and in tests.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::mnemonic::mnemonic_to_seed;
use crate::crypto::path::{parse_segment, ROOT_PATH};
use crate::error::{Error, Result};
use super::derivation::ExtendedKey;

/// Curves the host may be asked to derive for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    Secp256k1,
    Ed25519,
}

/// A root entropy request: a BIP-32 style path and a curve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntropyRequest {
    pub path: Vec<String>,
    pub curve: Curve,
}

impl EntropyRequest {
    /// The Aptos root: `m/44'/637'` on secp256k1
    pub fn aptos() -> Self {
        Self {
            path: ROOT_PATH.iter().map(|s| s.to_string()).collect(),
            curve: Curve::Secp256k1,
        }
    }
}

/// Source of root entropy
#[async_trait]
pub trait EntropyService: Send + Sync {
    /// Return the extended key at `request.path`; faults surface as
    /// `Error::EntropyUnavailable`
    async fn root_entropy(&self, request: &EntropyRequest) -> Result<ExtendedKey>;
}

/// Entropy service backed by a BIP-39 seed held in memory
pub struct SeedEntropy {
    seed: Zeroizing<Vec<u8>>,
}

impl SeedEntropy {
    pub fn from_seed(seed: Vec<u8>) -> Self {
        Self { seed: Zeroizing::new(seed) }
    }

    pub fn from_mnemonic(phrase: &str, passphrase: Option<&str>) -> Result<Self> {
        Ok(Self { seed: mnemonic_to_seed(phrase, passphrase)? })
    }
}

impl fmt::Debug for SeedEntropy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeedEntropy(<redacted>)")
    }
}

#[async_trait]
impl EntropyService for SeedEntropy {
    async fn root_entropy(&self, request: &EntropyRequest) -> Result<ExtendedKey> {
        if request.curve != Curve::Secp256k1 {
            return Err(Error::EntropyUnavailable(format!(
                "unsupported curve {:?}",
                request.curve
            )));
        }

        let (first, rest) = request
            .path
            .split_first()
            .ok_or_else(|| Error::EntropyUnavailable("empty root path".to_string()))?;
        if first != "m" {
            return Err(Error::EntropyUnavailable(format!("root path must start at m, got {}", first)));
        }

        let indices = rest
            .iter()
            .map(|segment| {
                parse_segment(segment).ok_or_else(|| {
                    Error::EntropyUnavailable(format!("unsupported root segment {}", segment))
                })
            })
            .collect::<Result<Vec<u32>>>()?;

        ExtendedKey::master_from_seed(&self.seed)?.derive_path(&indices)
    }
}
