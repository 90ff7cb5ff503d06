//! Error types for Classkit.
//!
//! Only infrastructure failures live here. Expected business outcomes
//! (unknown code, exhausted slots, expired trial) are plain values, see
//! [`crate::license::Rejection`] and [`crate::feature::GateDecision`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Licensing errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "Activation of {code} partially failed: {reason}. Contact support with this code."
    )]
    ActivationFailed { code: String, reason: String },

    #[error("License store contention on {code} after {attempts} attempts")]
    StoreContention { code: String, attempts: u32 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Infrastructure errors
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable(_)
                | Error::Database(_)
                | Error::Network(_)
                | Error::Io(_)
                | Error::StoreContention { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Error::Serialization(format!("invalid timestamp: {}", err))
    }
}
