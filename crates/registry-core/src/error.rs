//! Error types for the registry update core
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for domain update reconciliation
#[derive(Error, Debug)]
pub enum Error {
    /// Persisted data contradicts an invariant of the domain model
    ///
    /// Not recoverable by the client; signals a consistency bug upstream.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration errors (including missing tld pricing)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity store-related errors
    #[error("Entity store error: {0}")]
    EntityStore(String),

    /// DNS refresh queue errors
    #[error("DNS queue error: {0}")]
    DnsQueue(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invariant violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an entity store error
    pub fn entity_store(msg: impl Into<String>) -> Self {
        Self::EntityStore(msg.into())
    }

    /// Create a DNS queue error
    pub fn dns_queue(msg: impl Into<String>) -> Self {
        Self::DnsQueue(msg.into())
    }

    /// Whether this error aborts the update before anything could be persisted
    ///
    /// Invariant and configuration failures are raised while the update is
    /// still being computed.
    pub fn is_pre_commit(&self) -> bool {
        matches!(
            self,
            Self::InvariantViolation(_) | Self::Config(_) | Self::InvalidInput(_) | Self::NotFound(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
