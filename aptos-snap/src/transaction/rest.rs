//! Aptos fullnode REST client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::account::AccountAddress;
use crate::error::{Error, Result};
use super::provider::{ChainClient, ProviderConfig};
use super::types::{ChainParams, FinalizedTransaction, SignedTransaction};

const SIGNED_TRANSACTION_CONTENT_TYPE: &str = "application/x.aptos.signed_transaction+bcs";
const BALANCE_FUNCTION: &str = "0x1::coin::balance";
const APTOS_COIN: &str = "0x1::aptos_coin::AptosCoin";
const PENDING_TRANSACTION: &str = "pending_transaction";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Upper bound for a single finality poll
const POLL_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// `ChainClient` over the fullnode REST API
#[derive(Debug, Clone)]
pub struct RestClient {
    config: ProviderConfig,
    http: Client,
    timeout: Duration,
}

impl RestClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http, timeout })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.config.url.trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn get_json(&self, path: &str) -> Result<(StatusCode, Value)> {
        let response = self.authorize(self.http.get(self.endpoint(path))).send().await?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    async fn poll_transaction(&self, path: &str, timeout: Duration) -> reqwest::Result<(StatusCode, Value)> {
        let response = self
            .authorize(self.http.get(self.endpoint(path)))
            .timeout(timeout)
            .send()
            .await?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    async fn get_ok(&self, path: &str) -> Result<Value> {
        let (status, body) = self.get_json(path).await?;
        if !status.is_success() {
            return Err(Error::Network(format!("GET {} returned {}: {}", path, status, error_message(&body))));
        }
        Ok(body)
    }

    async fn sequence_number(&self, address: &AccountAddress) -> Result<u64> {
        let (status, body) = self.get_json(&format!("accounts/{}", address)).await?;
        if status == StatusCode::NOT_FOUND {
            debug!("Account {} not on chain yet, using sequence number 0", address);
            return Ok(0);
        }
        if !status.is_success() {
            return Err(Error::Network(format!("account lookup returned {}: {}", status, error_message(&body))));
        }
        parse_account_sequence(&body)
    }
}

#[async_trait]
impl ChainClient for RestClient {
    async fn chain_params(&self, sender: &AccountAddress) -> Result<ChainParams> {
        let ledger = self.get_ok("").await?;
        let (chain_id, ledger_timestamp_secs) = parse_ledger_info(&ledger)?;
        let sequence_number = self.sequence_number(sender).await?;
        let gas_unit_price = parse_gas_estimate(&self.get_ok("estimate_gas_price").await?)?;

        Ok(ChainParams {
            chain_id,
            sequence_number,
            gas_unit_price,
            ledger_timestamp_secs,
        })
    }

    async fn fund_account(&self, address: &AccountAddress, amount: u64) -> Result<()> {
        let faucet = self
            .config
            .faucet_url
            .as_deref()
            .ok_or_else(|| Error::Network(format!("no faucet configured for {}", self.config.network)))?;
        let url = format!("{}/mint", faucet.trim_end_matches('/'));

        let response = self
            .http
            .post(url)
            .query(&[("amount", amount.to_string()), ("address", address.to_hex())])
            .send()
            .await?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(Error::Network(format!("faucet returned {}: {}", status, error_message(&body))));
        }

        // The faucet answers with the hashes of its mint transactions
        let hashes: Vec<String> = serde_json::from_value(body).unwrap_or_default();
        for hash in hashes {
            self.wait_for_finality(&hash).await?;
        }
        info!("Funded {} with {} octas", address, amount);
        Ok(())
    }

    async fn balance(&self, address: &AccountAddress) -> Result<u64> {
        let request = json!({
            "function": BALANCE_FUNCTION,
            "type_arguments": [APTOS_COIN],
            "arguments": [address.to_hex()],
        });
        let response = self
            .authorize(self.http.post(self.endpoint("view")))
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(Error::Network(format!("balance view returned {}: {}", status, error_message(&body))));
        }
        parse_view_u64(&body)
    }

    async fn submit(&self, transaction: &SignedTransaction) -> Result<String> {
        let response = self
            .authorize(self.http.post(self.endpoint("transactions")))
            .header(reqwest::header::CONTENT_TYPE, SIGNED_TRANSACTION_CONTENT_TYPE)
            .body(transaction.to_bcs())
            .send()
            .await
            .map_err(|e| Error::Submission(e.to_string()))?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(Error::Submission(format!("node returned {}: {}", status, error_message(&body))));
        }

        let hash = body
            .get("hash")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| transaction.hash());
        debug!("Submitted transaction {}", hash);
        Ok(hash)
    }

    async fn wait_for_finality(&self, hash: &str) -> Result<FinalizedTransaction> {
        let deadline = Instant::now() + self.timeout;
        let path = format!("transactions/by_hash/{}", hash);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.poll_transaction(&path, remaining.min(POLL_REQUEST_TIMEOUT)).await {
                Ok((status, body)) if status.is_success() => {
                    if let Some(finalized) = parse_transaction_status(hash, &body)? {
                        if !finalized.success {
                            return Err(Error::Submission(format!(
                                "transaction {} failed: {}",
                                hash, finalized.vm_status
                            )));
                        }
                        return Ok(finalized);
                    }
                }
                Ok((status, _)) if status == StatusCode::NOT_FOUND => {}
                Ok((status, body)) => {
                    return Err(Error::Network(format!(
                        "transaction lookup returned {}: {}",
                        status,
                        error_message(&body)
                    )));
                }
                Err(e) if e.is_timeout() => debug!("Poll for {} timed out", hash),
                Err(e) => return Err(e.into()),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::FinalityTimeout(hash.to_string()));
            }
            sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }
}

#[derive(Deserialize)]
struct LedgerInfo {
    chain_id: u8,
    /// Microseconds, as a decimal string
    ledger_timestamp: String,
}

fn parse_ledger_info(body: &Value) -> Result<(u8, u64)> {
    let info: LedgerInfo = serde_json::from_value(body.clone())?;
    let micros = parse_u64_str(&info.ledger_timestamp, "ledger_timestamp")?;
    Ok((info.chain_id, micros / 1_000_000))
}

fn parse_account_sequence(body: &Value) -> Result<u64> {
    let value = body
        .get("sequence_number")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Serialization("account resource has no sequence_number".to_string()))?;
    parse_u64_str(value, "sequence_number")
}

fn parse_gas_estimate(body: &Value) -> Result<u64> {
    body.get("gas_estimate")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::Serialization("gas price response has no gas_estimate".to_string()))
}

/// View functions return a JSON array; u64 results are decimal strings
fn parse_view_u64(body: &Value) -> Result<u64> {
    let value = body
        .get(0)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Serialization(format!("unexpected view result {}", body)))?;
    parse_u64_str(value, "balance")
}

/// `None` while the transaction is still pending
fn parse_transaction_status(hash: &str, body: &Value) -> Result<Option<FinalizedTransaction>> {
    let kind = body.get("type").and_then(Value::as_str).unwrap_or_default();
    if kind == PENDING_TRANSACTION {
        return Ok(None);
    }

    let success = body
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| Error::Serialization(format!("transaction {} has no success flag", hash)))?;
    let vm_status = body
        .get("vm_status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let version = body
        .get("version")
        .and_then(Value::as_str)
        .and_then(|v| v.parse::<u64>().ok());
    let hash = body
        .get("hash")
        .and_then(Value::as_str)
        .unwrap_or(hash)
        .to_string();

    Ok(Some(FinalizedTransaction { hash, version, success, vm_status }))
}

fn parse_u64_str(value: &str, field: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|e| Error::Serialization(format!("{} {:?}: {}", field, value, e)))
}

fn error_message(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}
