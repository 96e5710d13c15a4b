//! Aptos Snap Host
//!
//! Provides the host facilities the snap core expects (seed entropy, a
//! confirmation dialog, persistent storage, a chain client) and serves the
//! request router as JSON-RPC over HTTP.

pub mod config;
pub mod confirm;
pub mod rpc;
pub mod state;
pub mod storage;
