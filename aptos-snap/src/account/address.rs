//! Aptos account addresses

use std::fmt;
use std::str::FromStr;

use secp256k1::PublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};

use crate::error::{Error, Result};

/// `AnyPublicKey::Secp256k1Ecdsa` variant tag
const ANY_PUBLIC_KEY_SECP256K1: u8 = 0x01;

/// Uncompressed SEC1 point length
const SECP256K1_PUBLIC_KEY_LENGTH: u8 = 65;

/// Authentication key scheme for single-key accounts
const SINGLE_KEY_SCHEME: u8 = 0x02;

/// A 32-byte Aptos account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    pub const LENGTH: usize = 32;

    /// The framework address `0x1`
    pub const ONE: Self = {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        Self(bytes)
    };

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Address of a fresh single-key secp256k1 account: its authentication key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update([ANY_PUBLIC_KEY_SECP256K1, SECP256K1_PUBLIC_KEY_LENGTH]);
        hasher.update(public_key.serialize_uncompressed());
        hasher.update([SINGLE_KEY_SCHEME]);

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// Parse `0x` followed by 1 to 64 hex digits; short forms are left-padded
    pub fn from_hex(value: &str) -> Result<Self> {
        let digits = value
            .strip_prefix("0x")
            .ok_or_else(|| Error::InvalidParameter(format!("address {:?} must start with 0x", value)))?;

        if digits.is_empty() || digits.len() > 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidParameter(format!("malformed address {:?}", value)));
        }

        let padded = format!("{:0>64}", digits);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| Error::InvalidParameter(format!("malformed address {:?}: {}", value, e)))?;

        Ok(Self(bytes))
    }

    /// Long form: `0x` plus 64 lowercase hex digits
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_hex())
    }
}

impl FromStr for AccountAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value).map_err(serde::de::Error::custom)
    }
}
