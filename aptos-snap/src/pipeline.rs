//! Confirmation-gated signing and submission
//!
//! Each request walks `Built -> Rendered -> Approved | Denied -> Signed ->
//! Submitted -> Finalized`. Denial is terminal: nothing is signed or sent.
//! Funding and balance lookups are diagnostic side steps whose failures are
//! logged and otherwise ignored.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account::{Account, AccountAddress};
use crate::confirm::{ConfirmationGate, Renderable};
use crate::error::{Error, Result};
use crate::transaction::{
    ChainClient, FinalizedTransaction, SignedTransaction, TransactionBuilder, TransferRequest,
    UnsignedTransaction, DEFAULT_EXPIRATION_SECS, DEFAULT_MAX_GAS_AMOUNT,
};

/// Pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Built,
    Rendered,
    Approved,
    Denied,
    Signed,
    Submitted,
    Finalized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Built => "BUILT",
            Stage::Rendered => "RENDERED",
            Stage::Approved => "APPROVED",
            Stage::Denied => "DENIED",
            Stage::Signed => "SIGNED",
            Stage::Submitted => "SUBMITTED",
            Stage::Finalized => "FINALIZED",
        };
        f.write_str(name)
    }
}

/// Tuning for transaction building and the best-effort side steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Octas to request from the faucet before sending; `None` skips funding
    pub fund_amount: Option<u64>,
    pub max_gas_amount: u64,
    /// Seconds after the ledger timestamp before the transaction expires
    pub expiration_secs: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            fund_amount: None,
            max_gas_amount: DEFAULT_MAX_GAS_AMOUNT,
            expiration_secs: DEFAULT_EXPIRATION_SECS,
        }
    }
}

#[derive(Clone)]
pub struct SigningPipeline {
    client: Arc<dyn ChainClient>,
    gate: ConfirmationGate,
    builder: TransactionBuilder,
    options: PipelineOptions,
}

impl SigningPipeline {
    pub fn new(client: Arc<dyn ChainClient>, gate: ConfirmationGate, options: PipelineOptions) -> Self {
        Self {
            client,
            gate,
            builder: TransactionBuilder::new(options.max_gas_amount, options.expiration_secs),
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Build, confirm and sign a transfer without broadcasting it
    pub async fn sign_transfer(&self, account: &Account, transfer: &TransferRequest) -> Result<SignedTransaction> {
        let txn = self.build(account.address(), transfer).await?;
        self.approve(&txn, "Approve transaction").await?;
        self.sign(&txn, account)
    }

    /// Full pipeline: build, confirm, sign, submit and wait for finality
    pub async fn sign_and_submit(
        &self,
        account: &Account,
        transfer: &TransferRequest,
    ) -> Result<FinalizedTransaction> {
        let sender = account.address();
        let mut txn = self.build(sender, transfer).await?;
        self.approve(&txn, "Approve transfer").await?;

        // Funding waits on faucet finality, which can outlast the expiry window
        if let Some(amount) = self.options.fund_amount {
            self.fund_best_effort(&sender, amount).await;
            self.renew_expiration(&mut txn).await;
        }
        self.log_balance("before transfer", &sender).await;

        let signed = self.sign(&txn, account)?;
        let hash = self.client.submit(&signed).await?;
        advance(Stage::Submitted, &hash);

        let finalized = self.client.wait_for_finality(&hash).await?;
        if !finalized.success {
            return Err(Error::Submission(format!(
                "transaction {} failed: {}",
                finalized.hash, finalized.vm_status
            )));
        }
        advance(Stage::Finalized, &finalized.hash);
        info!("Transfer of {} octas from {} finalized as {}", transfer.amount, sender, finalized.hash);

        self.log_balance("after transfer", &sender).await;
        self.log_balance("receiver after transfer", &transfer.receiver).await;

        Ok(finalized)
    }

    async fn build(&self, sender: AccountAddress, transfer: &TransferRequest) -> Result<UnsignedTransaction> {
        let params = self.client.chain_params(&sender).await?;
        let txn = self.builder.build_transfer(sender, transfer, &params);
        advance(Stage::Built, &sender.to_hex());
        Ok(txn)
    }

    async fn approve(&self, txn: &UnsignedTransaction, heading: &str) -> Result<()> {
        let renderable = Renderable::transaction(heading, txn);
        advance(Stage::Rendered, &txn.sender.to_hex());

        if self.gate.confirm(&renderable).await? {
            advance(Stage::Approved, &txn.sender.to_hex());
            Ok(())
        } else {
            advance(Stage::Denied, &txn.sender.to_hex());
            Err(Error::UserDenied)
        }
    }

    fn sign(&self, txn: &UnsignedTransaction, account: &Account) -> Result<SignedTransaction> {
        let signed = txn.sign(account)?;
        advance(Stage::Signed, &signed.hash());
        Ok(signed)
    }

    async fn fund_best_effort(&self, address: &AccountAddress, amount: u64) {
        match self.client.fund_account(address, amount).await {
            Ok(()) => debug!("Funded {} with {} octas", address, amount),
            Err(e) => warn!("Funding {} failed, continuing: {}", address, e),
        }
    }

    async fn renew_expiration(&self, txn: &mut UnsignedTransaction) {
        match self.client.chain_params(&txn.sender).await {
            Ok(params) => {
                self.builder.renew_expiration(txn, &params);
                debug!("Expiration for {} renewed to {}", txn.sender, txn.expiration_timestamp_secs);
            }
            Err(e) => warn!("Could not renew expiration for {}: {}", txn.sender, e),
        }
    }

    async fn log_balance(&self, label: &str, address: &AccountAddress) {
        match self.client.balance(address).await {
            Ok(balance) => info!("Balance of {} {}: {}", address, label, balance),
            Err(e) => warn!("Balance lookup for {} {} failed: {}", address, label, e),
        }
    }
}

impl fmt::Debug for SigningPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningPipeline")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn advance(stage: Stage, subject: &str) {
    debug!(stage = %stage, subject, "Pipeline transition");
}
