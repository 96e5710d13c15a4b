//! Key derivation and management
//!
//! Keys are derived on demand from host entropy and dropped (and wiped) as
//! soon as the request that needed them completes.

mod derivation;
pub mod entropy;

pub use derivation::*;
pub use entropy::*;
