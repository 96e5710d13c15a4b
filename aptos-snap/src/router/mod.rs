//! Request router
//!
//! The single external surface: `(method, params)` in, JSON out. Params are
//! parsed into a typed [`Request`] before any key derivation or network call.

mod request;

pub use request::*;

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::account::AccountFactory;
use crate::confirm::{ConfirmationGate, ConfirmationService, Renderable, TxnField};
use crate::crypto::keys::EntropyService;
use crate::crypto::path::DerivationPath;
use crate::error::{Error, Result};
use crate::pipeline::{PipelineOptions, SigningPipeline};
use crate::state::{AccountRecord, StateStore, StorageService};
use crate::transaction::{ChainClient, TransferRequest};

/// Host collaborators the router needs
#[derive(Clone)]
pub struct Services {
    pub entropy: Arc<dyn EntropyService>,
    pub confirmation: Arc<dyn ConfirmationService>,
    pub storage: Arc<dyn StorageService>,
    pub client: Arc<dyn ChainClient>,
}

pub struct Router {
    accounts: AccountFactory,
    gate: ConfirmationGate,
    pipeline: SigningPipeline,
    state: StateStore,
    client: Arc<dyn ChainClient>,
}

impl Router {
    pub fn new(services: Services, options: PipelineOptions) -> Self {
        let gate = ConfirmationGate::new(services.confirmation);
        Self {
            accounts: AccountFactory::new(services.entropy),
            pipeline: SigningPipeline::new(services.client.clone(), gate.clone(), options),
            gate,
            state: StateStore::new(services.storage),
            client: services.client,
        }
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Dispatch one call by method name
    pub async fn handle(&self, method: &str, params: &Value) -> Result<Value> {
        let method: Method = method.parse()?;
        let request = Request::parse(method, params)?;
        debug!("Dispatching {}", method);

        let result = self.dispatch(request).await?;
        info!("{} completed", method);
        Ok(result)
    }

    /// Run an already validated request
    pub async fn dispatch(&self, request: Request) -> Result<Value> {
        match request {
            Request::GetAccountAddress { path } => self.get_account_address(&path).await,
            Request::GetPublicKey { path } => self.get_public_key(&path).await,
            Request::GetPrivateKey { path } => self.get_private_key(&path).await,
            Request::GetAccounts => Ok(serde_json::to_value(self.state.accounts().await?)?),
            Request::GetBalance { path } => self.get_balance(&path).await,
            Request::CreateNewAccount { path, name } => self.create_new_account(path, name).await,
            Request::SignMessage { path, message } => self.sign_message(&path, &message).await,
            Request::SignAllMessages { path, messages } => self.sign_all_messages(&path, &messages).await,
            Request::SignTransaction { path, transfer } => self.sign_transaction(&path, &transfer).await,
            Request::SignAndSendTransaction { path, transfer } => {
                self.sign_and_send_transaction(&path, &transfer).await
            }
            Request::SetData { key, value } => {
                self.state.set(&key, value).await?;
                Ok(json!({ "message": "Data saved successfully" }))
            }
            Request::GetData => Ok(Value::Object(self.state.get().await?)),
            Request::ClearData => {
                self.state.clear().await?;
                Ok(json!({ "message": "Data cleared successfully" }))
            }
        }
    }

    async fn get_account_address(&self, path: &DerivationPath) -> Result<Value> {
        let address = self.accounts.address_of(path).await?;
        self.gate
            .notify(&Renderable::text("This is your account address", address.clone()))
            .await;
        Ok(Value::String(address))
    }

    async fn get_public_key(&self, path: &DerivationPath) -> Result<Value> {
        let public_key = self.accounts.public_key_of(path).await?;
        self.gate
            .notify(&Renderable::text("This is your public key", public_key.clone()))
            .await;
        Ok(Value::String(public_key))
    }

    /// Revealed only after approval; nothing is derived on denial
    async fn get_private_key(&self, path: &DerivationPath) -> Result<Value> {
        let renderable = Renderable::new(
            "Reveal private key?",
            TxnField::composite([
                ("derivationPath", TxnField::Text(path.to_string())),
                (
                    "warning",
                    TxnField::Text("Anyone with this key controls the account.".to_string()),
                ),
            ]),
        );
        self.gate.require(&renderable).await?;

        Ok(Value::String(self.accounts.private_key_of(path).await?))
    }

    async fn get_balance(&self, path: &DerivationPath) -> Result<Value> {
        let address = self.accounts.account_from_path(path).await?.address();
        let balance = self.client.balance(&address).await?;
        Ok(json!({
            "address": address.to_hex(),
            "balance": balance.to_string(),
        }))
    }

    /// Append an account to the persisted list and return its address.
    ///
    /// The whole read-modify-write runs under the store's lock.
    async fn create_new_account(&self, path: Option<DerivationPath>, name: Option<String>) -> Result<Value> {
        let mut book = self.state.accounts_mut().await?;
        let (path, default_name) = match path {
            Some(path) => (path, format!("Account {}", book.records().len())),
            None => {
                let index = book.next_index()?;
                (DerivationPath::account(index)?, format!("Account {}", index))
            }
        };
        if book.contains(&path) {
            return Err(Error::DuplicateAccount(path.to_string()));
        }

        let account = self.accounts.account_from_path(&path).await?;
        let address = account.address().to_hex();
        let name = name.unwrap_or(default_name);

        book.push(AccountRecord::new(name.clone(), path.clone()))?;
        book.commit().await?;
        info!("Created account {:?} at {}", name, path);

        Ok(Value::String(address))
    }

    async fn sign_message(&self, path: &DerivationPath, message: &MessagePayload) -> Result<Value> {
        let account = self.accounts.account_from_path(path).await?;
        let renderable = Renderable::new(
            "Sign message?",
            TxnField::composite([
                ("signer", TxnField::Address(account.address())),
                ("message", message.to_field()),
            ]),
        );
        self.gate.require(&renderable).await?;

        let signature = account.sign(message.as_bytes())?;
        Ok(json!({
            "signature": signature.to_hex(),
            "publicKey": account.public_key_hex(),
        }))
    }

    /// One confirmation covering every message
    async fn sign_all_messages(&self, path: &DerivationPath, messages: &[MessagePayload]) -> Result<Value> {
        let account = self.accounts.account_from_path(path).await?;
        let renderable = Renderable::new(
            format!("Sign {} messages?", messages.len()),
            TxnField::composite([
                ("signer", TxnField::Address(account.address())),
                ("messages", TxnField::List(messages.iter().map(MessagePayload::to_field).collect())),
            ]),
        );
        self.gate.require(&renderable).await?;

        let public_key = account.public_key_hex();
        let signatures = messages
            .iter()
            .map(|message| {
                let signature = account.sign(message.as_bytes())?;
                Ok(json!({
                    "signature": signature.to_hex(),
                    "publicKey": public_key,
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Value::Array(signatures))
    }

    async fn sign_transaction(&self, path: &DerivationPath, transfer: &TransferRequest) -> Result<Value> {
        let account = self.accounts.account_from_path(path).await?;
        let signed = self.pipeline.sign_transfer(&account, transfer).await?;

        Ok(json!({
            "hash": signed.hash(),
            "signature": signed.signature.to_hex(),
            "publicKey": account.public_key_hex(),
            "signedTransaction": signed.to_hex(),
        }))
    }

    async fn sign_and_send_transaction(&self, path: &DerivationPath, transfer: &TransferRequest) -> Result<Value> {
        let account = self.accounts.account_from_path(path).await?;
        let finalized = self.pipeline.sign_and_submit(&account, transfer).await?;
        Ok(Value::String(finalized.hash))
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
