//! Transfer transaction construction

use serde_json::Value;

use crate::account::AccountAddress;
use crate::error::{Error, Result};
use super::types::{ChainParams, EntryFunctionId, TransactionArgument, UnsignedTransaction};

pub const DEFAULT_MAX_GAS_AMOUNT: u64 = 20_000;
pub const DEFAULT_EXPIRATION_SECS: u64 = 20;

/// A validated transfer of native coin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub receiver: AccountAddress,
    pub amount: u64,
}

impl TransferRequest {
    /// Validate a receiver string and amount before anything touches the network
    pub fn new(receiver: &str, amount: u64) -> Result<Self> {
        let receiver = receiver.trim();
        if receiver.is_empty() {
            return Err(Error::InvalidTransfer("receiver is empty".to_string()));
        }
        let receiver = AccountAddress::from_hex(receiver)
            .map_err(|e| Error::InvalidTransfer(format!("receiver: {}", e)))?;
        if amount == 0 {
            return Err(Error::InvalidTransfer("amount must be positive".to_string()));
        }

        Ok(Self { receiver, amount })
    }
}

/// Read an amount given as a JSON integer or a decimal string.
///
/// Anything that is not a positive integer fitting in `u64` is rejected.
pub fn parse_amount(value: &Value) -> Result<u64> {
    let amount = match value {
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| Error::InvalidTransfer(format!("amount {} is not a u64", number)))?,
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::InvalidTransfer(format!("amount {:?} is not an integer", text)));
            }
            text.parse::<u64>()
                .map_err(|e| Error::InvalidTransfer(format!("amount {:?}: {}", text, e)))?
        }
        other => {
            return Err(Error::InvalidTransfer(format!("amount must be an integer, got {}", other)));
        }
    };

    if amount == 0 {
        return Err(Error::InvalidTransfer("amount must be positive".to_string()));
    }
    Ok(amount)
}

/// Builds `0x1::aptos_account::transfer` transactions
#[derive(Debug, Clone, Copy)]
pub struct TransactionBuilder {
    max_gas_amount: u64,
    expiration_secs: u64,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self {
            max_gas_amount: DEFAULT_MAX_GAS_AMOUNT,
            expiration_secs: DEFAULT_EXPIRATION_SECS,
        }
    }
}

impl TransactionBuilder {
    pub fn new(max_gas_amount: u64, expiration_secs: u64) -> Self {
        Self { max_gas_amount, expiration_secs }
    }

    pub fn transfer_function() -> EntryFunctionId {
        EntryFunctionId::new(AccountAddress::ONE, "aptos_account", "transfer")
    }

    pub fn build_transfer(
        &self,
        sender: AccountAddress,
        transfer: &TransferRequest,
        params: &ChainParams,
    ) -> UnsignedTransaction {
        UnsignedTransaction {
            sender,
            function: Self::transfer_function(),
            function_arguments: vec![
                TransactionArgument::Address(transfer.receiver),
                TransactionArgument::U64(transfer.amount),
            ],
            sequence_number: params.sequence_number,
            max_gas_amount: self.max_gas_amount,
            gas_unit_price: params.gas_unit_price,
            expiration_timestamp_secs: params.ledger_timestamp_secs.saturating_add(self.expiration_secs),
            chain_id: params.chain_id,
        }
    }

    /// Push the expiry out to `expiration_secs` past the current ledger time.
    /// Never shortens it.
    pub fn renew_expiration(&self, txn: &mut UnsignedTransaction, params: &ChainParams) {
        let renewed = params.ledger_timestamp_secs.saturating_add(self.expiration_secs);
        txn.expiration_timestamp_secs = txn.expiration_timestamp_secs.max(renewed);
    }
}
