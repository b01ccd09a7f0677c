//! Container Instance Store Error Hierarchy
//!
//! Defines the error taxonomy surfaced by the store, categorized by who can
//! fix the failure: the caller, the stored data, or the backend.

use std::path::PathBuf;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or missing required fields, unsupported filter keys,
    /// empty identifiers. Always caller-fixable, never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A value already resident in the backend failed to decode
    #[error("Malformed record: {0}")]
    MalformedRecord(#[from] CodecError),

    /// More than one record behind a point key
    #[error("Ambiguous result: {matches} records found for key {key}")]
    AmbiguousResult { key: String, matches: usize },

    /// Backend communication or transaction-setup failure
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }

    pub fn is_malformed_record(&self) -> bool {
        matches!(self, Error::MalformedRecord(_))
    }

    pub fn is_ambiguous_result(&self) -> bool {
        matches!(self, Error::AmbiguousResult { .. })
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}

/// Record decoding failures
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Payload is not a well-formed document
    #[error("document is not well-formed: {0}")]
    Syntax(#[from] serde_json::Error),

    /// Document has no detail block
    #[error("detail block is missing")]
    MissingDetail,

    /// A mandatory identifier is absent or empty
    #[error("mandatory field `{0}` is missing or empty")]
    MissingField(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Embedded database errors
    #[error(transparent)]
    Sled(#[from] sled::Error),

    /// Disk I/O failures while opening the backend
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Custom error with the path that failed to open
    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The transactional client could not be obtained or set up
    #[error("Transaction setup failed: {0}")]
    TransactionSetup(String),

    /// A stored value is not valid UTF-8
    #[error("Value stored at {key} is not valid UTF-8")]
    Encoding { key: String },

    /// The backend could not establish a prefix watch
    #[error("Watch setup failed: {0}")]
    WatchSetup(String),

    /// Generic backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Error::StoreUnavailable(StorageError::Sled(e))
    }
}
