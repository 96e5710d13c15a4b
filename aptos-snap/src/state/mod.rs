//! Persisted application state
//!
//! A flat JSON object kept by the host's secure storage. Writes are
//! read-modify-write merges; the account list is one key inside it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::debug;

use crate::crypto::path::DerivationPath;
use crate::error::{Error, Result};

/// Flat key-value state
pub type StateMap = Map<String, Value>;

/// Key under which the account list is stored
pub const ACCOUNTS_KEY: &str = "accounts";

/// Number of accounts shown before the user has created any
pub const DEFAULT_ACCOUNT_COUNT: u32 = 5;

/// Host storage slot
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Stored state, `None` when nothing was ever written
    async fn load(&self) -> Result<Option<StateMap>>;
    async fn save(&self, state: &StateMap) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Storage that lives as long as the process
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    slot: RwLock<Option<StateMap>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageService for InMemoryStorage {
    async fn load(&self) -> Result<Option<StateMap>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, state: &StateMap) -> Result<()> {
        *self.slot.write().await = Some(state.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

/// A named derivation path in the account list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub name: String,
    pub derivation_path: DerivationPath,
}

impl AccountRecord {
    pub fn new(name: impl Into<String>, derivation_path: DerivationPath) -> Self {
        Self { name: name.into(), derivation_path }
    }

    /// `Account i` at `[i', 0']`
    pub fn numbered(index: u32) -> Result<Self> {
        Ok(Self::new(format!("Account {}", index), DerivationPath::account(index)?))
    }

    /// Accounts shown when none are persisted
    pub fn defaults() -> Vec<Self> {
        (0..DEFAULT_ACCOUNT_COUNT)
            .filter_map(|index| Self::numbered(index).ok())
            .collect()
    }
}

/// State store over a host storage service
pub struct StateStore {
    storage: Arc<dyn StorageService>,
    write_lock: Mutex<()>,
}

impl StateStore {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Current state; empty when nothing was stored
    pub async fn get(&self) -> Result<StateMap> {
        Ok(self.storage.load().await?.unwrap_or_default())
    }

    /// Merge one key into the stored state
    pub async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.merge(key, value).await
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.storage.clear().await?;
        debug!("State cleared");
        Ok(())
    }

    /// Persisted accounts, or the defaults when none are stored
    pub async fn accounts(&self) -> Result<Vec<AccountRecord>> {
        let state = self.get().await?;
        read_accounts(&state)
    }

    /// Lock the account list for a read-modify-write
    pub async fn accounts_mut(&self) -> Result<AccountBook<'_>> {
        let guard = self.write_lock.lock().await;
        let records = self.accounts().await?;
        Ok(AccountBook {
            store: self,
            records,
            _guard: guard,
        })
    }

    async fn merge(&self, key: &str, value: Value) -> Result<()> {
        let mut state = self.get().await?;
        state.insert(key.to_string(), value);
        self.storage.save(&state).await?;
        debug!("State key {:?} updated", key);
        Ok(())
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore").finish_non_exhaustive()
    }
}

fn read_accounts(state: &StateMap) -> Result<Vec<AccountRecord>> {
    match state.get(ACCOUNTS_KEY) {
        None | Some(Value::Null) => Ok(AccountRecord::defaults()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| Error::Serialization(format!("stored accounts are malformed: {}", e))),
    }
}

/// Account list held under the store's write lock
pub struct AccountBook<'a> {
    store: &'a StateStore,
    records: Vec<AccountRecord>,
    _guard: MutexGuard<'a, ()>,
}

impl AccountBook<'_> {
    pub fn records(&self) -> &[AccountRecord] {
        &self.records
    }

    /// Lowest index `n` at or above the list length whose `[n', 0']` is unused
    pub fn next_index(&self) -> Result<u32> {
        let mut index = u32::try_from(self.records.len())
            .map_err(|_| Error::InvalidPath("account list is full".to_string()))?;
        while self.contains(&DerivationPath::account(index)?) {
            index += 1;
        }
        Ok(index)
    }

    pub fn contains(&self, path: &DerivationPath) -> bool {
        self.records.iter().any(|r| &r.derivation_path == path)
    }

    pub fn push(&mut self, record: AccountRecord) -> Result<()> {
        if self.contains(&record.derivation_path) {
            return Err(Error::DuplicateAccount(record.derivation_path.to_string()));
        }
        self.records.push(record);
        Ok(())
    }

    /// Persist and release the lock
    pub async fn commit(self) -> Result<()> {
        let value = serde_json::to_value(&self.records)?;
        self.store.merge(ACCOUNTS_KEY, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> StateStore {
        StateStore::new(Arc::new(InMemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_get_on_empty_state() {
        let store = store();
        assert!(store.get().await.unwrap().is_empty());
        assert_eq!(store.accounts().await.unwrap(), AccountRecord::defaults());
    }

    #[tokio::test]
    async fn test_set_merges() {
        let store = store();
        store.set("theme", json!("dark")).await.unwrap();
        store.set("k", json!("v")).await.unwrap();
        store.set("k", json!("v")).await.unwrap();

        let state = store.get().await.unwrap();
        assert_eq!(state["k"], "v");
        assert_eq!(state["theme"], "dark");
        assert_eq!(state.len(), 2);

        store.clear().await.unwrap();
        assert!(store.get().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_account_book() {
        let store = store();

        let mut book = store.accounts_mut().await.unwrap();
        assert_eq!(book.next_index().unwrap(), 5);
        book.push(AccountRecord::numbered(5).unwrap()).unwrap();
        book.push(AccountRecord::numbered(6).unwrap()).unwrap();
        book.push(AccountRecord::numbered(8).unwrap()).unwrap();
        assert_eq!(book.next_index().unwrap(), 9);
        assert!(matches!(
            book.push(AccountRecord::numbered(0).unwrap()),
            Err(Error::DuplicateAccount(_))
        ));
        book.commit().await.unwrap();

        let accounts = store.accounts().await.unwrap();
        assert_eq!(accounts.len(), 8);
        assert_eq!(accounts[5].name, "Account 5");

        let stored = &store.get().await.unwrap()[ACCOUNTS_KEY];
        assert_eq!(stored[0]["derivationPath"], json!(["0'", "0'"]));
    }

    #[test]
    fn test_malformed_accounts() {
        let mut state = StateMap::new();
        state.insert(ACCOUNTS_KEY.to_string(), json!("oops"));
        assert!(read_accounts(&state).is_err());
    }
}
