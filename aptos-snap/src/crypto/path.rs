//! Derivation path validation
//!
//! Request paths are sequences of hardened segments such as `["0'", "0'"]`.
//! They are appended to the fixed Aptos prefix `m/44'/637'` that the host
//! entropy service derives for us.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Offset added to an index to mark hardened derivation
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// BIP-44 purpose segment
pub const PURPOSE: &str = "44'";

/// SLIP-44 registered coin type for Aptos
pub const COIN_TYPE: &str = "637'";

/// Root path requested from the host entropy service
pub const ROOT_PATH: [&str; 3] = ["m", PURPOSE, COIN_TYPE];

/// Parse a hardened segment into its (unhardened) index.
///
/// Returns `None` unless the segment is a canonical decimal index below
/// 2^31 followed by a single apostrophe.
pub fn parse_segment(segment: &str) -> Option<u32> {
    let index = segment.strip_suffix('\'')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let value = index.parse::<u32>().ok()?;
    if value.to_string() != index || value >= HARDENED_OFFSET {
        return None;
    }

    Some(value)
}

/// Check a single path segment
pub fn is_valid_segment(segment: &str) -> bool {
    parse_segment(segment).is_some()
}

/// Check a whole path: non-empty and every segment valid
pub fn is_valid_path<S: AsRef<str>>(path: &[S]) -> bool {
    !path.is_empty() && path.iter().all(|segment| is_valid_segment(segment.as_ref()))
}

/// A validated, non-empty sequence of hardened segments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct DerivationPath(Vec<String>);

impl DerivationPath {
    /// Validate and wrap a list of segments
    pub fn new(segments: Vec<String>) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::InvalidPath("path is empty".to_string()));
        }

        if let Some(bad) = segments.iter().find(|s| !is_valid_segment(s)) {
            return Err(Error::InvalidPath(format!("invalid segment {:?}", bad)));
        }

        Ok(Self(segments))
    }

    /// Conventional path for the account at `index`: `[index', 0']`
    pub fn account(index: u32) -> Result<Self> {
        Self::new(vec![format!("{}'", index), "0'".to_string()])
    }

    /// The raw segments
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Unhardened indices, in path order
    pub fn indices(&self) -> Vec<u32> {
        // Every segment was validated in `new`
        self.0.iter().filter_map(|s| parse_segment(s)).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<String>> for DerivationPath {
    type Error = Error;

    fn try_from(segments: Vec<String>) -> Result<Self> {
        Self::new(segments)
    }
}

impl From<DerivationPath> for Vec<String> {
    fn from(path: DerivationPath) -> Self {
        path.0
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ROOT_PATH.join("/"))?;
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}
