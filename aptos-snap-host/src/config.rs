//! Host configuration from flags and environment

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use aptos_snap::pipeline::PipelineOptions;
use aptos_snap::transaction::{Network, ProviderConfig};

#[derive(Debug, Parser)]
#[command(name = "aptos-snap-host")]
#[command(about = "Serve the Aptos snap over JSON-RPC")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: HostConfig,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the JSON-RPC server (default)
    Serve,
    /// Print a fresh BIP-39 mnemonic and exit
    GenerateMnemonic {
        /// 12 or 24 words
        #[arg(long, default_value_t = 24)]
        words: u8,
    },
}

#[derive(Debug, Clone, Args)]
pub struct HostConfig {
    /// Address the JSON-RPC server listens on
    #[arg(long, env = "SNAP_LISTEN_ADDR", default_value = "127.0.0.1:3000")]
    pub listen_addr: SocketAddr,

    /// devnet, testnet, mainnet or local
    #[arg(long, env = "SNAP_NETWORK", default_value = "testnet")]
    pub network: Network,

    /// Fullnode REST URL; defaults by network
    #[arg(long, env = "SNAP_NODE_URL")]
    pub node_url: Option<String>,

    /// Faucet URL; defaults by network where one exists
    #[arg(long, env = "SNAP_FAUCET_URL")]
    pub faucet_url: Option<String>,

    #[arg(long, env = "SNAP_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// JSON file holding persisted state
    #[arg(long, env = "SNAP_STATE_PATH", default_value = "./data/snap-state.json")]
    pub state_path: PathBuf,

    /// Wallet seed phrase
    #[arg(long, env = "SNAP_MNEMONIC", hide_env_values = true)]
    pub mnemonic: Option<String>,

    /// Octas to request from the faucet before each transfer
    #[arg(long, env = "SNAP_FUND_AMOUNT")]
    pub fund_amount: Option<u64>,

    /// Request and finality timeout in seconds
    #[arg(long, env = "SNAP_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl HostConfig {
    pub fn provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::for_network(self.network);
        if let Some(url) = &self.node_url {
            config.url = url.clone();
        }
        if let Some(url) = &self.faucet_url {
            config.faucet_url = Some(url.clone());
        }
        config.api_key = self.api_key.clone();
        config.timeout = Some(self.timeout_secs);
        config
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            fund_amount: self.fund_amount,
            ..PipelineOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["aptos-snap-host", "--mnemonic", "abandon"]).unwrap();
        assert!(cli.command.is_none());

        let config = cli.config;
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.timeout_secs, 30);

        let provider = config.provider_config();
        assert_eq!(provider.url, Network::Testnet.default_url());
        assert_eq!(provider.timeout, Some(30));
        assert!(config.pipeline_options().fund_amount.is_none());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "aptos-snap-host",
            "--network",
            "devnet",
            "--node-url",
            "http://127.0.0.1:8080/v1",
            "--fund-amount",
            "100000000",
            "generate-mnemonic",
            "--words",
            "12",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Command::GenerateMnemonic { words: 12 })));
        assert_eq!(cli.config.provider_config().url, "http://127.0.0.1:8080/v1");
        assert_eq!(cli.config.pipeline_options().fund_amount, Some(100_000_000));
    }
}
