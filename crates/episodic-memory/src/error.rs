//! Error types for the episodic memory subsystem

use episodic_llm::LlmError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by episodic memory components
#[derive(Debug, Error)]
pub enum EpisodicError {
    /// An oracle call failed after the retry policy was exhausted
    #[error("Oracle call failed during {operation}: {source}")]
    Oracle {
        /// Operation that issued the call
        operation: String,
        /// Underlying oracle error
        #[source]
        source: LlmError,
    },

    /// The oracle answered with something we cannot parse
    #[error("Malformed oracle output during {operation}: {details}")]
    MalformedOutput {
        /// Operation that issued the call
        operation: String,
        /// What was wrong with the output
        details: String,
    },

    /// A store backend failed
    #[error("Storage error during {operation}: {source}")]
    Storage {
        /// Store operation
        operation: String,
        /// Backend error
        #[source]
        source: BoxError,
    },

    /// A value violated a constraint
    #[error("Validation error: {field} {constraint} (got {value})")]
    Validation {
        /// Offending field
        field: String,
        /// Constraint that was violated
        constraint: String,
        /// Value that was supplied
        value: String,
    },

    /// The conversation loop failed
    #[error("Agent error: {message}")]
    Agent {
        /// Description of the failure
        message: String,
        /// Underlying cause
        #[source]
        source: Option<BoxError>,
    },

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File I/O failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EpisodicError {
    /// Oracle failure during `operation`
    pub fn oracle(operation: impl Into<String>, source: LlmError) -> Self {
        Self::Oracle {
            operation: operation.into(),
            source,
        }
    }

    /// Unparseable oracle output during `operation`
    pub fn malformed_output(operation: impl Into<String>, details: impl Into<String>) -> Self {
        Self::MalformedOutput {
            operation: operation.into(),
            details: details.into(),
        }
    }

    /// Store backend failure during `operation`
    pub fn storage(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Constraint violation
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
        }
    }

    /// Conversation loop failure caused by `source`
    pub fn agent(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Agent {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the failure is transient
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Oracle { source, .. } => source.is_retryable(),
            Self::Agent {
                source: Some(source),
                ..
            } => source
                .downcast_ref::<LlmError>()
                .map(LlmError::is_retryable)
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Result alias for episodic memory operations
pub type EpisodicResult<T> = std::result::Result<T, EpisodicError>;
