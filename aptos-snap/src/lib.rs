//! Aptos Snap Core - HD keys, confirmation-gated signing and app state
//!
//! This library derives secp256k1 accounts under `m/44'/637'`, builds and
//! signs Aptos transfer transactions behind an explicit user confirmation,
//! and keeps a small persisted key-value state. Host facilities (entropy,
//! dialogs, storage, the chain client) are injected as traits.

pub mod error;
pub mod crypto;
pub mod account;
pub mod transaction;
pub mod confirm;
pub mod pipeline;
pub mod state;
pub mod router;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use router::{Router, Services};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
