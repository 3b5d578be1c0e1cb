//! Error types for the tensor logic engine.

use thiserror::Error;

/// The main error type for tensor logic operations.
#[derive(Debug, Error)]
pub enum TlError {
    /// Candle tensor operation failed
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Tensor shapes incompatible with the requested operation
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// A rule input fact was not in the store at application time
    #[error("missing input fact: {0}")]
    MissingInput(String),

    /// An operation tag outside the four defined kinds
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// A rule that violates structural constraints (arity, empty output)
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// A rule definition file that fails validation
    #[error("invalid rule definition: {0}")]
    InvalidDefinition(String),

    /// I/O error while reading a rule file
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error in a rule file
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for tensor logic operations.
pub type Result<T> = std::result::Result<T, TlError>;
