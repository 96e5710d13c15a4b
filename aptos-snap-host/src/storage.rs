//! File-backed state storage

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use aptos_snap::error::{Error, Result};
use aptos_snap::state::{StateMap, StorageService};

/// One JSON object on disk, replaced atomically on every save
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Host(format!("Failed to {} {}: {}", action, path.display(), e))
}

#[async_trait]
impl StorageService for FileStorage {
    async fn load(&self) -> Result<Option<StateMap>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", &self.path, e)),
        };

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(state) => Ok(Some(state)),
            Value::Null => Ok(None),
            other => Err(Error::Host(format!(
                "{} does not hold a JSON object: {}",
                self.path.display(),
                other
            ))),
        }
    }

    async fn save(&self, state: &StateMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create", parent, e))?;
        }

        let bytes = serde_json::to_vec_pretty(state)?;
        let temp = self.temp_path();
        fs::write(&temp, bytes)
            .await
            .map_err(|e| io_error("write", &temp, e))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| io_error("replace", &self.path, e))?;

        tracing::debug!("Saved {} state keys to {}", state.len(), self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &self.path, e)),
        }
    }
}
