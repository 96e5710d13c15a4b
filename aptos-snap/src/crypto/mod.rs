//! Cryptographic primitives and operations
//!
//! This module provides derivation path validation, mnemonic handling and
//! SLIP-10 key derivation for Aptos accounts.

pub mod mnemonic;
pub mod keys;
pub mod path;

pub use keys::*;
pub use path::*;
