//! Error types for the audit engine

use thiserror::Error;

/// Result type alias for audit engine operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Main error type for the audit engine
///
/// Every variant bubbles to the interception layer, which owns the decision
/// of whether to fail the enclosing transaction. The engine itself never
/// retries and never drops an audit write to keep going.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Missing or invalid configuration: no primary-key spec for a table,
    /// an invalid identifier, or mismatched before/after batches. Fatal at
    /// setup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A row lacks one or more of its configured key fields. The engine
    /// does not guess an identity.
    #[error("Row in table '{table}' is missing key field(s): {fields:?}")]
    MissingKey { table: String, fields: Vec<String> },

    /// A row's identity could not be derived even through the canonical
    /// serialization fallback.
    #[error("Identity resolution failed: {0}")]
    IdentityResolution(String),

    /// A read or write against the audit/data store failed. Always
    /// propagated: losing audit records is a worse failure than failing
    /// the mutation.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Payload serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
