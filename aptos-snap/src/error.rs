//! Error types for the aptos-snap library

use thiserror::Error;

/// Custom error type for aptos-snap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or empty derivation path
    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),

    /// A required request parameter is absent
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// A request parameter is present but has the wrong shape
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The host could not provide root entropy
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),

    /// Bad transfer receiver or amount
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    /// The user explicitly rejected the operation
    #[error("User rejected the request.")]
    UserDenied,

    /// Broadcast failed or the transaction executed unsuccessfully
    #[error("Submission error: {0}")]
    Submission(String),

    /// The client gave up waiting for finality
    #[error("Timed out waiting for transaction {0}")]
    FinalityTimeout(String),

    /// No handler is registered for the method name
    #[error("Method not found: {0}")]
    UnknownMethod(String),

    /// The derivation path is already present in the account list
    #[error("Account already exists for path {0}")]
    DuplicateAccount(String),

    /// Key or signature handling failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Storage or dialog fault reported by the host
    #[error("Host error: {0}")]
    Host(String),

    /// Transport-level fault talking to the chain
    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// JSON-RPC style error code reported to callers
    pub fn code(&self) -> i64 {
        match self {
            Error::UserDenied => 4001,
            Error::UnknownMethod(_) => -32601,
            Error::InvalidPath(_)
            | Error::MissingParameter(_)
            | Error::InvalidParameter(_)
            | Error::InvalidTransfer(_)
            | Error::DuplicateAccount(_) => -32602,
            _ => -32000,
        }
    }

    /// Whether the error was raised by local validation, before any
    /// secret material or network call was touched
    pub fn is_validation(&self) -> bool {
        self.code() == -32602
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

/// Result type for aptos-snap operations
pub type Result<T> = std::result::Result<T, Error>;
