//! Error types for flag evaluation and client lifecycle.

use thiserror::Error;

/// Result type for flag operations.
pub type FlagResult<T> = Result<T, FlagError>;

/// Flag evaluation and lifecycle errors.
///
/// Variants carry rendered messages rather than source errors so the type is
/// `Clone` and can be handed to every caller awaiting a shared initialization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlagError {
    /// The adapter failed to initialize. The client returns to the
    /// uninitialized state and `initialize()` may be retried.
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// `evaluate()` was called before `initialize()` completed, or after `close()`.
    #[error("Flag client is not initialized")]
    NotInitialized,

    /// An adapter failed while evaluating a flag.
    #[error("Evaluation of '{flag}' failed: {message}")]
    Evaluation {
        /// Flag being evaluated.
        flag: String,
        /// Adapter failure message.
        message: String,
    },

    /// Static misconfiguration detected at construction time.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No source (adapter, caller default, schema) produced a value.
    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    /// A value does not belong to the flag's declared domain.
    #[error("Value {value} is not valid for flag '{flag}'")]
    InvalidValue {
        /// Flag name.
        flag: String,
        /// Rendered offending value.
        value: String,
    },
}

impl FlagError {
    /// Convenience constructor for adapter failures.
    pub fn evaluation(flag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Evaluation {
            flag: flag.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for construction-time misconfiguration.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
