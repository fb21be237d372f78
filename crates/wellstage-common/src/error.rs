//! Error types for Wellstage
//!
//! The variants mirror the pipeline's failure taxonomy: fatal errors
//! (authentication, truncate, cyclic catalog) propagate and abort the run,
//! while contained errors (page fetch, slice write) are logged at the call
//! site and never surface through this type.

use thiserror::Error;

/// Result type alias for Wellstage operations
pub type Result<T> = std::result::Result<T, StageError>;

/// Main error type for Wellstage
#[derive(Error, Debug)]
pub enum StageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Cyclic table dependency involving: {0}")]
    CyclicDependency(String),

    #[error("Table {table} references undeclared table {referenced}")]
    UnknownReference { table: String, referenced: String },

    #[error("Table {0} references itself")]
    SelfReference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
