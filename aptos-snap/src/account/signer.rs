//! Signing-capable accounts

use std::fmt;

use secp256k1::{ecdsa, Message, PublicKey, Secp256k1};
use sha3::{Digest, Sha3_256};

use crate::crypto::keys::KeyMaterial;
use crate::error::{Error, Result};
use super::address::AccountAddress;

/// A 64-byte compact secp256k1 ECDSA signature (low-S)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Check this signature over `message` against an uncompressed or
    /// compressed SEC1 public key
    pub fn verify(&self, public_key: &[u8], message: &[u8]) -> bool {
        let secp = Secp256k1::verification_only();
        let Ok(public_key) = PublicKey::from_slice(public_key) else {
            return false;
        };
        let Ok(signature) = ecdsa::Signature::from_compact(&self.0) else {
            return false;
        };
        match message_digest(message) {
            Ok(digest) => secp.verify_ecdsa(&digest, &signature, &public_key).is_ok(),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

fn message_digest(message: &[u8]) -> Result<Message> {
    let digest = Sha3_256::digest(message);
    Message::from_digest_slice(&digest).map_err(|e| Error::Signing(e.to_string()))
}

/// A derived identity able to sign.
///
/// Holds its key only for as long as the request that built it.
pub struct Account {
    key: KeyMaterial,
    public_key: PublicKey,
    address: AccountAddress,
}

impl Account {
    pub fn from_key_material(key: KeyMaterial) -> Result<Self> {
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::from_secret_key(&secp, &key.secret_key()?);
        let address = AccountAddress::from_public_key(&public_key);

        Ok(Self { key, public_key, address })
    }

    /// Re-import a key revealed by `private_key_hex`
    pub fn from_private_key_hex(value: &str) -> Result<Self> {
        Self::from_key_material(KeyMaterial::from_hex(value)?)
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    /// 65-byte uncompressed SEC1 public key
    pub fn public_key_bytes(&self) -> [u8; 65] {
        self.public_key.serialize_uncompressed()
    }

    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.public_key_bytes()))
    }

    pub fn private_key_hex(&self) -> String {
        self.key.to_hex()
    }

    /// ECDSA over `sha3-256(message)`; RFC 6979 nonces, so deterministic
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        let secp = Secp256k1::signing_only();
        let digest = message_digest(message)?;
        let signature = secp.sign_ecdsa(&digest, &self.key.secret_key()?);
        Ok(Signature(signature.serialize_compact()))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
