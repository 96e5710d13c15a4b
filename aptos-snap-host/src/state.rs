//! Application state management

use std::sync::Arc;

use anyhow::{Context, Result};
use zeroize::Zeroizing;

use aptos_snap::confirm::ConfirmationService;
use aptos_snap::crypto::keys::SeedEntropy;
use aptos_snap::crypto::mnemonic::validate_mnemonic;
use aptos_snap::transaction::{ProviderConfig, RestClient};
use aptos_snap::{Router, Services};

use crate::config::HostConfig;
use crate::confirm::ConsoleConfirmation;
use crate::storage::FileStorage;

/// Shared by every HTTP handler
pub struct AppState {
    pub router: Router,
    pub provider_config: ProviderConfig,
}

impl AppState {
    pub fn new(router: Router, provider_config: ProviderConfig) -> Self {
        Self { router, provider_config }
    }

    /// Wire the host services described by `config`
    pub fn from_config(config: &HostConfig) -> Result<Self> {
        let mnemonic = Zeroizing::new(
            config
                .mnemonic
                .clone()
                .context("SNAP_MNEMONIC (or --mnemonic) is required to serve")?,
        );
        validate_mnemonic(&mnemonic).context("SNAP_MNEMONIC is not a valid BIP-39 phrase")?;

        let provider_config = config.provider_config();
        let client = RestClient::new(provider_config.clone()).context("Failed to create chain client")?;
        let confirmation: Arc<dyn ConfirmationService> = Arc::new(ConsoleConfirmation::new());

        let services = Services {
            entropy: Arc::new(SeedEntropy::from_mnemonic(&mnemonic, None)?),
            confirmation,
            storage: Arc::new(FileStorage::new(&config.state_path)),
            client: Arc::new(client),
        };

        Ok(Self::new(Router::new(services, config.pipeline_options()), provider_config))
    }
}
