//! Human confirmation gate

mod render;

pub use render::*;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Outcome of a confirmation dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogResponse {
    Approved,
    Denied,
    Dismissed,
}

/// Host dialog service
#[async_trait]
pub trait ConfirmationService: Send + Sync {
    /// Show `renderable` and wait for the user's answer
    async fn prompt(&self, renderable: &Renderable) -> Result<DialogResponse>;

    /// Show a non-blocking notice
    async fn notify(&self, _renderable: &Renderable) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct ConfirmationGate {
    service: Arc<dyn ConfirmationService>,
}

impl ConfirmationGate {
    pub fn new(service: Arc<dyn ConfirmationService>) -> Self {
        Self { service }
    }

    /// `true` only on explicit approval
    pub async fn confirm(&self, renderable: &Renderable) -> Result<bool> {
        let response = self.service.prompt(renderable).await?;
        debug!("Confirmation for {:?}: {:?}", renderable.heading, response);
        Ok(response == DialogResponse::Approved)
    }

    /// Like `confirm`, but anything short of approval is `UserDenied`
    pub async fn require(&self, renderable: &Renderable) -> Result<()> {
        if self.confirm(renderable).await? {
            Ok(())
        } else {
            Err(Error::UserDenied)
        }
    }

    /// Informational notice; failures are logged and ignored
    pub async fn notify(&self, renderable: &Renderable) {
        if let Err(e) = self.service.notify(renderable).await {
            warn!("Failed to show notice {:?}: {}", renderable.heading, e);
        }
    }
}

impl std::fmt::Debug for ConfirmationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationGate").finish_non_exhaustive()
    }
}
