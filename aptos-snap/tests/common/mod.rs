//! Host doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use aptos_snap::account::AccountAddress;
use aptos_snap::confirm::{ConfirmationService, DialogResponse, Renderable};
use aptos_snap::crypto::keys::{EntropyRequest, EntropyService, ExtendedKey, SeedEntropy};
use aptos_snap::error::{Error, Result};
use aptos_snap::pipeline::PipelineOptions;
use aptos_snap::state::InMemoryStorage;
use aptos_snap::transaction::{ChainClient, ChainParams, FinalizedTransaction, SignedTransaction};
use aptos_snap::{Router, Services};

pub const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Seed entropy that counts how often it is asked
pub struct CountingEntropy {
    inner: SeedEntropy,
    pub requests: AtomicUsize,
}

impl CountingEntropy {
    pub fn new() -> Self {
        Self {
            inner: SeedEntropy::from_mnemonic(PHRASE, None).unwrap(),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntropyService for CountingEntropy {
    async fn root_entropy(&self, request: &EntropyRequest) -> Result<ExtendedKey> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.inner.root_entropy(request).await
    }
}

/// Entropy service that is always locked
pub struct LockedEntropy;

#[async_trait]
impl EntropyService for LockedEntropy {
    async fn root_entropy(&self, _request: &EntropyRequest) -> Result<ExtendedKey> {
        Err(Error::Host("keyring locked".to_string()))
    }
}

/// Answers prompts from a script, then with a fallback
pub struct ScriptedConfirmation {
    script: Mutex<VecDeque<DialogResponse>>,
    fallback: DialogResponse,
    pub prompts: Mutex<Vec<Renderable>>,
    pub notices: Mutex<Vec<Renderable>>,
}

impl ScriptedConfirmation {
    pub fn always(response: DialogResponse) -> Self {
        Self::scripted(Vec::new(), response)
    }

    pub fn scripted(script: Vec<DialogResponse>, fallback: DialogResponse) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            prompts: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<Renderable> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ConfirmationService for ScriptedConfirmation {
    async fn prompt(&self, renderable: &Renderable) -> Result<DialogResponse> {
        self.prompts.lock().unwrap().push(renderable.clone());
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or(self.fallback))
    }

    async fn notify(&self, renderable: &Renderable) -> Result<()> {
        self.notices.lock().unwrap().push(renderable.clone());
        Ok(())
    }
}

/// Chain client that records submissions instead of broadcasting
pub struct RecordingClient {
    pub params: ChainParams,
    /// Ledger time reported by `chain_params`
    pub ledger_secs: AtomicU64,
    /// Seconds of ledger time a faucet request takes
    pub fund_delay_secs: u64,
    pub submitted: Mutex<Vec<SignedTransaction>>,
    pub param_requests: AtomicUsize,
    pub fund_requests: AtomicUsize,
    pub balance_requests: AtomicUsize,
    /// Make funding and balance lookups fail
    pub side_steps_fail: bool,
    /// Report executed transactions as failed
    pub execution_fails: bool,
    /// Reject every broadcast
    pub submit_fails: bool,
    /// Never see submitted transactions finalize
    pub finality_times_out: bool,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            params: ChainParams {
                chain_id: 2,
                sequence_number: 4,
                gas_unit_price: 100,
                ledger_timestamp_secs: 1_700_000_000,
            },
            ledger_secs: AtomicU64::new(1_700_000_000),
            fund_delay_secs: 0,
            submitted: Mutex::new(Vec::new()),
            param_requests: AtomicUsize::new(0),
            fund_requests: AtomicUsize::new(0),
            balance_requests: AtomicUsize::new(0),
            side_steps_fail: false,
            execution_fails: false,
            submit_fails: false,
            finality_times_out: false,
        }
    }

    pub fn failing_side_steps() -> Self {
        Self { side_steps_fail: true, ..Self::new() }
    }

    pub fn failing_execution() -> Self {
        Self { execution_fails: true, ..Self::new() }
    }

    pub fn failing_submission() -> Self {
        Self { submit_fails: true, ..Self::new() }
    }

    pub fn never_finalizing() -> Self {
        Self { finality_times_out: true, ..Self::new() }
    }

    /// A faucet that takes `secs` of ledger time to finish minting
    pub fn slow_faucet(secs: u64) -> Self {
        Self { fund_delay_secs: secs, ..Self::new() }
    }

    pub fn ledger_now(&self) -> u64 {
        self.ledger_secs.load(Ordering::SeqCst)
    }

    /// Broadcast attempts, failed ones included
    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainClient for RecordingClient {
    async fn chain_params(&self, _sender: &AccountAddress) -> Result<ChainParams> {
        self.param_requests.fetch_add(1, Ordering::SeqCst);
        Ok(ChainParams { ledger_timestamp_secs: self.ledger_now(), ..self.params })
    }

    async fn fund_account(&self, _address: &AccountAddress, _amount: u64) -> Result<()> {
        self.fund_requests.fetch_add(1, Ordering::SeqCst);
        self.ledger_secs.fetch_add(self.fund_delay_secs, Ordering::SeqCst);
        if self.side_steps_fail {
            return Err(Error::Network("faucet unreachable".to_string()));
        }
        Ok(())
    }

    async fn balance(&self, _address: &AccountAddress) -> Result<u64> {
        self.balance_requests.fetch_add(1, Ordering::SeqCst);
        if self.side_steps_fail {
            return Err(Error::Network("node unreachable".to_string()));
        }
        Ok(100_000_000)
    }

    async fn submit(&self, transaction: &SignedTransaction) -> Result<String> {
        self.submitted.lock().unwrap().push(transaction.clone());
        if self.submit_fails {
            return Err(Error::Submission("mempool is full".to_string()));
        }
        Ok(transaction.hash())
    }

    async fn wait_for_finality(&self, hash: &str) -> Result<FinalizedTransaction> {
        if self.finality_times_out {
            return Err(Error::FinalityTimeout(hash.to_string()));
        }
        Ok(FinalizedTransaction {
            hash: hash.to_string(),
            version: Some(42),
            success: !self.execution_fails,
            vm_status: if self.execution_fails {
                "Move abort: EINSUFFICIENT_BALANCE".to_string()
            } else {
                "Executed successfully".to_string()
            },
        })
    }
}

/// A router wired to in-memory doubles
pub struct Harness {
    pub entropy: Arc<CountingEntropy>,
    pub confirmation: Arc<ScriptedConfirmation>,
    pub client: Arc<RecordingClient>,
    pub router: Router,
}

impl Harness {
    pub fn new(confirmation: ScriptedConfirmation, client: RecordingClient, options: PipelineOptions) -> Self {
        let entropy = Arc::new(CountingEntropy::new());
        let confirmation = Arc::new(confirmation);
        let client = Arc::new(client);
        let services = Services {
            entropy: entropy.clone(),
            confirmation: confirmation.clone(),
            storage: Arc::new(InMemoryStorage::new()),
            client: client.clone(),
        };

        Self {
            entropy,
            confirmation,
            client,
            router: Router::new(services, options),
        }
    }

    pub fn approving() -> Self {
        Self::new(
            ScriptedConfirmation::always(DialogResponse::Approved),
            RecordingClient::new(),
            PipelineOptions::default(),
        )
    }

    pub fn denying() -> Self {
        Self::new(
            ScriptedConfirmation::always(DialogResponse::Denied),
            RecordingClient::new(),
            PipelineOptions::default(),
        )
    }
}
