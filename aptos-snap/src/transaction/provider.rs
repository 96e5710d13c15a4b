//! Blockchain client boundary

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::account::AccountAddress;
use crate::error::{Error, Result};
use super::types::{ChainParams, FinalizedTransaction, SignedTransaction};

/// Aptos networks with well-known endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
    Local,
}

impl Network {
    pub fn default_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://fullnode.mainnet.aptoslabs.com/v1",
            Network::Testnet => "https://fullnode.testnet.aptoslabs.com/v1",
            Network::Devnet => "https://fullnode.devnet.aptoslabs.com/v1",
            Network::Local => "http://127.0.0.1:8080/v1",
        }
    }

    /// Faucet endpoint, where the network has one
    pub fn default_faucet_url(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => None,
            Network::Testnet => Some("https://faucet.testnet.aptoslabs.com"),
            Network::Devnet => Some("https://faucet.devnet.aptoslabs.com"),
            Network::Local => Some("http://127.0.0.1:8081"),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
            Network::Local => "local",
        };
        f.write_str(name)
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            "local" | "localnet" => Ok(Network::Local),
            other => Err(Error::InvalidParameter(format!("unknown network {:?}", other))),
        }
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Network the endpoints belong to
    pub network: Network,
    /// Fullnode REST URL, including the `/v1` prefix
    pub url: String,
    /// Faucet URL for best-effort funding
    pub faucet_url: Option<String>,
    /// API key sent as a bearer token
    pub api_key: Option<String>,
    /// Request and finality timeout in seconds
    pub timeout: Option<u64>,
}

impl ProviderConfig {
    /// Defaults for a known network
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            url: network.default_url().to_string(),
            faucet_url: network.default_faucet_url().map(str::to_string),
            api_key: None,
            timeout: Some(30),
        }
    }
}

/// Everything the signing pipeline needs from the chain.
///
/// Implementations own their retry and timeout policy.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain id, sequence number, gas price and ledger time for `sender`
    async fn chain_params(&self, sender: &AccountAddress) -> Result<ChainParams>;

    /// Ask a faucet to mint `amount` octas to `address`
    async fn fund_account(&self, address: &AccountAddress, amount: u64) -> Result<()>;

    /// Native coin balance in octas
    async fn balance(&self, address: &AccountAddress) -> Result<u64>;

    /// Broadcast and return the transaction hash
    async fn submit(&self, transaction: &SignedTransaction) -> Result<String>;

    /// Block until the transaction leaves the mempool
    async fn wait_for_finality(&self, hash: &str) -> Result<FinalizedTransaction>;
}
