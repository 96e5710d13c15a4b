//! Account management functionality
//!
//! Accounts are rebuilt from their derivation path on every operation; no
//! derived key outlives the call that produced it.

mod address;
mod signer;

pub use address::*;
pub use signer::*;

use std::sync::Arc;

use crate::crypto::keys::{EntropyService, KeyDeriver};
use crate::crypto::path::DerivationPath;
use crate::error::Result;

/// Builds accounts from derivation paths
#[derive(Debug, Clone)]
pub struct AccountFactory {
    deriver: KeyDeriver,
}

impl AccountFactory {
    pub fn new(entropy: Arc<dyn EntropyService>) -> Self {
        Self { deriver: KeyDeriver::new(entropy) }
    }

    pub async fn account_from_path(&self, path: &DerivationPath) -> Result<Account> {
        let key = self.deriver.derive(path).await?;
        Account::from_key_material(key)
    }

    pub async fn address_of(&self, path: &DerivationPath) -> Result<String> {
        Ok(self.account_from_path(path).await?.address().to_hex())
    }

    pub async fn public_key_of(&self, path: &DerivationPath) -> Result<String> {
        Ok(self.account_from_path(path).await?.public_key_hex())
    }

    pub async fn private_key_of(&self, path: &DerivationPath) -> Result<String> {
        Ok(self.account_from_path(path).await?.private_key_hex())
    }
}
