//! Common transaction types

use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::account::{Account, AccountAddress, Signature};
use crate::error::Result;
use super::bcs::{u64_bytes, BcsWriter};

const RAW_TRANSACTION_SALT: &[u8] = b"APTOS::RawTransaction";
const TRANSACTION_SALT: &[u8] = b"APTOS::Transaction";

// BCS variant tags
const PAYLOAD_ENTRY_FUNCTION: u32 = 2;
const AUTHENTICATOR_SINGLE_SENDER: u32 = 4;
const ACCOUNT_AUTHENTICATOR_SINGLE_KEY: u32 = 2;
const ANY_KEY_SECP256K1: u32 = 1;
const TRANSACTION_USER: u32 = 0;

/// Fully qualified Move entry function, e.g. `0x1::aptos_account::transfer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFunctionId {
    pub address: AccountAddress,
    pub module: String,
    pub name: String,
}

impl EntryFunctionId {
    pub fn new(address: AccountAddress, module: &str, name: &str) -> Self {
        Self {
            address,
            module: module.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for EntryFunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = self.address.to_hex();
        let short = address.trim_start_matches("0x").trim_start_matches('0');
        let short = if short.is_empty() { "0" } else { short };
        write!(f, "0x{}::{}::{}", short, self.module, self.name)
    }
}

/// Entry function arguments this agent produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionArgument {
    Address(AccountAddress),
    U64(u64),
}

impl TransactionArgument {
    /// BCS encoding of the argument value
    pub fn to_bcs(&self) -> Vec<u8> {
        match self {
            TransactionArgument::Address(address) => address.as_bytes().to_vec(),
            TransactionArgument::U64(value) => u64_bytes(*value),
        }
    }
}

/// Chain metadata fetched before building a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub chain_id: u8,
    pub sequence_number: u64,
    pub gas_unit_price: u64,
    /// Ledger time in seconds, used as the base for expiration
    pub ledger_timestamp_secs: u64,
}

/// An unsigned single-entry-function transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub sender: AccountAddress,
    pub function: EntryFunctionId,
    pub function_arguments: Vec<TransactionArgument>,
    pub sequence_number: u64,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
    pub chain_id: u8,
}

impl UnsignedTransaction {
    /// BCS encoding of the `RawTransaction`
    pub fn to_bcs(&self) -> Vec<u8> {
        let mut writer = BcsWriter::new();
        writer
            .write_fixed(self.sender.as_bytes())
            .write_u64(self.sequence_number)
            .write_variant(PAYLOAD_ENTRY_FUNCTION)
            .write_fixed(self.function.address.as_bytes())
            .write_str(&self.function.module)
            .write_str(&self.function.name)
            // no type arguments
            .write_uleb128(0)
            .write_uleb128(self.function_arguments.len() as u64);
        for argument in &self.function_arguments {
            writer.write_bytes(&argument.to_bcs());
        }
        writer
            .write_u64(self.max_gas_amount)
            .write_u64(self.gas_unit_price)
            .write_u64(self.expiration_timestamp_secs)
            .write_u8(self.chain_id);
        writer.into_bytes()
    }

    /// Bytes the sender signs: domain-separated hash prefix plus the raw transaction
    pub fn signing_message(&self) -> Vec<u8> {
        let mut message = Sha3_256::digest(RAW_TRANSACTION_SALT).to_vec();
        message.extend_from_slice(&self.to_bcs());
        message
    }

    pub fn sign(&self, account: &Account) -> Result<SignedTransaction> {
        let signature = account.sign(&self.signing_message())?;
        Ok(SignedTransaction {
            raw: self.clone(),
            public_key: account.public_key_bytes(),
            signature,
        })
    }
}

/// A transaction with its single-key secp256k1 authenticator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: UnsignedTransaction,
    pub public_key: [u8; 65],
    pub signature: Signature,
}

impl SignedTransaction {
    pub fn to_bcs(&self) -> Vec<u8> {
        let mut writer = BcsWriter::new();
        writer
            .write_fixed(&self.raw.to_bcs())
            .write_variant(AUTHENTICATOR_SINGLE_SENDER)
            .write_variant(ACCOUNT_AUTHENTICATOR_SINGLE_KEY)
            .write_variant(ANY_KEY_SECP256K1)
            .write_bytes(&self.public_key)
            .write_variant(ANY_KEY_SECP256K1)
            .write_bytes(self.signature.as_bytes());
        writer.into_bytes()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bcs()))
    }

    /// Committed transaction hash, as the node reports it
    pub fn hash(&self) -> String {
        let mut hasher = Sha3_256::new();
        hasher.update(Sha3_256::digest(TRANSACTION_SALT));
        let mut tag = BcsWriter::new();
        tag.write_variant(TRANSACTION_USER);
        hasher.update(tag.into_bytes());
        hasher.update(self.to_bcs());
        format!("0x{}", hex::encode(hasher.finalize()))
    }

    /// Check the embedded signature against the embedded public key
    pub fn verify(&self) -> bool {
        self.signature.verify(&self.public_key, &self.raw.signing_message())
    }
}

/// Outcome of a transaction once the chain reports it executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedTransaction {
    pub hash: String,
    pub version: Option<u64>,
    pub success: bool,
    pub vm_status: String,
}
