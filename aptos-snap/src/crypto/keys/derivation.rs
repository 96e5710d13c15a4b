//! SLIP-10 secp256k1 hardened derivation

use std::fmt;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use secp256k1::{Scalar, SecretKey};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::path::{DerivationPath, HARDENED_OFFSET};
use crate::error::{Error, Result};
use super::entropy::{EntropyRequest, EntropyService};

type HmacSha512 = Hmac<Sha512>;

/// Raw private key bytes derived for one account.
///
/// Wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial([u8; 32]);

impl KeyMaterial {
    /// Wrap raw bytes, rejecting values that are not valid secp256k1 scalars
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self> {
        SecretKey::from_slice(&bytes)
            .map_err(|_| Error::Signing("invalid secp256k1 private key".to_string()))?;
        Ok(Self(bytes))
    }

    /// Parse a `0x`-prefixed (or bare) 64 digit hex string
    pub fn from_hex(value: &str) -> Result<Self> {
        let stripped = value.strip_prefix("0x").unwrap_or(value);
        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(stripped, bytes.as_mut_slice())
            .map_err(|_| Error::Signing("private key must be 32 hex-encoded bytes".to_string()))?;
        Self::from_bytes(*bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical `0x`-hex encoding; only for the explicit reveal operation
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub(crate) fn secret_key(&self) -> Result<SecretKey> {
        SecretKey::from_slice(&self.0)
            .map_err(|_| Error::Signing("invalid secp256k1 private key".to_string()))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

/// A private key plus chain code: one node of the derivation tree
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedKey {
    private_key: [u8; 32],
    chain_code: [u8; 32],
    depth: u8,
}

impl ExtendedKey {
    pub fn new(private_key: [u8; 32], chain_code: [u8; 32], depth: u8) -> Result<Self> {
        SecretKey::from_slice(&private_key)
            .map_err(|_| Error::EntropyUnavailable("invalid node private key".to_string()))?;
        Ok(Self { private_key, chain_code, depth })
    }

    /// Derive the master node from a BIP-39 seed
    pub fn master_from_seed(seed: &[u8]) -> Result<Self> {
        let digest = hmac_sha512(b"Bitcoin seed", &[seed])?;
        let (key, chain_code) = split_digest(&digest);
        Self::new(*key, *chain_code, 0)
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    /// Derive the hardened child at `index` (unhardened form, below 2^31)
    pub fn derive_hardened(&self, index: u32) -> Result<Self> {
        if index >= HARDENED_OFFSET {
            return Err(Error::InvalidPath(format!("index {} out of range", index)));
        }

        let parent = SecretKey::from_slice(&self.private_key)
            .map_err(|_| Error::EntropyUnavailable("invalid node private key".to_string()))?;
        let child_index = (index | HARDENED_OFFSET).to_be_bytes();

        let mut prefix = 0u8;
        let mut payload = Zeroizing::new(self.private_key);
        loop {
            let prefix_byte = [prefix];
            let parts: [&[u8]; 3] = [&prefix_byte, payload.as_slice(), &child_index];
            let digest = hmac_sha512(&self.chain_code, &parts)?;
            let (il, ir) = split_digest(&digest);

            let child = Scalar::from_be_bytes(*il)
                .ok()
                .and_then(|tweak| parent.add_tweak(&tweak).ok());

            match child {
                Some(child) => {
                    return Ok(Self {
                        private_key: child.secret_bytes(),
                        chain_code: *ir,
                        depth: self.depth.saturating_add(1),
                    });
                }
                // IL >= n or a zero key: retry from IR
                None => {
                    prefix = 1;
                    *payload = *ir;
                }
            }
        }
    }

    /// Walk a sequence of hardened indices
    pub fn derive_path(&self, indices: &[u32]) -> Result<Self> {
        indices
            .iter()
            .try_fold(self.clone(), |node, index| node.derive_hardened(*index))
    }

    /// Copy out this node's private key
    pub fn key_material(&self) -> Result<KeyMaterial> {
        KeyMaterial::from_bytes(self.private_key)
    }
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; 64]>> {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(key)
        .map_err(|_| Error::EntropyUnavailable("HMAC error".to_string()))?;
    for part in parts {
        mac.update(part);
    }

    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn split_digest(digest: &[u8; 64]) -> (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>) {
    let mut left = Zeroizing::new([0u8; 32]);
    let mut right = Zeroizing::new([0u8; 32]);
    left.copy_from_slice(&digest[..32]);
    right.copy_from_slice(&digest[32..]);
    (left, right)
}

/// Derives account keys from host entropy.
///
/// Each call requests the root node again; nothing is cached between calls.
#[derive(Clone)]
pub struct KeyDeriver {
    entropy: Arc<dyn EntropyService>,
}

impl KeyDeriver {
    pub fn new(entropy: Arc<dyn EntropyService>) -> Self {
        Self { entropy }
    }

    /// Derive the private key at `m/44'/637'/<path>`
    pub async fn derive(&self, path: &DerivationPath) -> Result<KeyMaterial> {
        let root = self
            .entropy
            .root_entropy(&EntropyRequest::aptos())
            .await
            .map_err(|e| match e {
                Error::EntropyUnavailable(_) => e,
                other => Error::EntropyUnavailable(other.to_string()),
            })?;

        tracing::debug!("Deriving {} levels below depth {}", path.len(), root.depth());
        root.derive_path(&path.indices())?.key_material()
    }
}

impl fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDeriver").finish_non_exhaustive()
    }
}
