//! Transaction functionality
//!
//! Building, encoding and signing Aptos transfer transactions, and the
//! client boundary used to broadcast them.

mod bcs;
pub mod builder;
pub mod provider;
pub mod rest;
pub mod types;

pub use builder::*;
pub use provider::*;
pub use rest::RestClient;
pub use types::*;
