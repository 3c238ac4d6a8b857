//! Error types shared across the crate.

use thiserror::Error;

/// Configuration resolution failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to parse settings file {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Key-value store failures.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A lookup on an attribute that is supposed to be unique matched more
    /// than one record.
    #[error("integrity violation: {matches} records in '{table}' have {attribute} = '{value}'")]
    Integrity {
        table: String,
        attribute: String,
        value: String,
        matches: usize,
    },
}

/// Blob store failures.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob backend error: {0}")]
    Backend(String),
}

/// Password hashing and verification failures.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Errors surfaced by repositories and the cascade coordinator.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("passwords do not match")]
    Unauthorized,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// HTTP gateway failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway failed to start: {reason}")]
    StartupFailed { reason: String },
}
