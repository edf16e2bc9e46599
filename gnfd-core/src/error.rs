//! Error types for Greenfield client operations
//!
//! Every failure in the hashing pipeline is terminal for the current call:
//! nothing is retried internally and no partial result is returned.

use thiserror::Error;

/// Result type alias for Greenfield client operations
pub type Result<T> = std::result::Result<T, GnfdError>;

/// Unified error type for the Greenfield client core
#[derive(Error, Debug)]
pub enum GnfdError {
    // ===== Input Errors =====
    #[error("Missing input: no content stream supplied")]
    MissingInput,

    #[error("Stream read failed: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Hashing cancelled")]
    Cancelled,

    // ===== Configuration Errors =====
    #[error("Redundancy parameters unavailable: {0}")]
    ConfigUnavailable(String),

    #[error("Invalid redundancy config: {0}")]
    InvalidConfig(String),

    // ===== Erasure Coding Errors =====
    #[error("Erasure coding error: {0}")]
    ErasureCoding(String),

    #[error("Insufficient shards: have {available}, need {required}")]
    InsufficientShards { available: usize, required: usize },

    #[error("Shard count mismatch: expected {expected}, got {actual}")]
    ShardSizeMismatch { expected: usize, actual: usize },

    // ===== Message Errors =====
    #[error("Invalid bucket name {name:?}: {reason}")]
    InvalidBucketName { name: String, reason: String },

    #[error("Invalid object name {name:?}: {reason}")]
    InvalidObjectName { name: String, reason: String },

    #[error("Invalid checksums: {0}")]
    InvalidChecksums(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // ===== Serialization Errors =====
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reed_solomon_erasure::Error> for GnfdError {
    fn from(err: reed_solomon_erasure::Error) -> Self {
        GnfdError::ErasureCoding(err.to_string())
    }
}

impl From<serde_json::Error> for GnfdError {
    fn from(err: serde_json::Error) -> Self {
        GnfdError::Serialization(err.to_string())
    }
}
