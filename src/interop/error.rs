//! Bridge Error Types

use std::fmt;

use thiserror::Error;

use super::types::{ForeignValue, VariantTag};

/// Failure signalled by foreign code during an invocation.
///
/// The bridge treats the contents as opaque and passes them through.
#[derive(Debug, Clone)]
pub struct ForeignError {
    /// Message reported by the foreign side
    pub message: String,
    /// Optional foreign value attached to the failure (e.g. a guest exception)
    pub payload: Option<ForeignValue>,
}

impl ForeignError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: None,
        }
    }

    /// Attach a foreign value to the failure
    pub fn with_payload(mut self, payload: ForeignValue) -> Self {
        self.payload = Some(payload);
        self
    }
}

impl fmt::Display for ForeignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(payload) = &self.payload {
            write!(f, " ({})", payload)?;
        }
        Ok(())
    }
}

impl std::error::Error for ForeignError {}

/// Argument rejected by a callable before any foreign code runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentError {
    /// Zero-based position of the offending argument
    pub index: usize,
    pub reason: String,
}

impl ArgumentError {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "argument {}: {}", self.index, self.reason)
    }
}

impl std::error::Error for ArgumentError {}

/// Errors surfaced by the bridge to native callers
#[derive(Debug, Clone, Error)]
pub enum InteropError {
    #[error("Name not found: {0}")]
    NameNotFound(String),

    #[error("Value is not executable (tag: {tag})")]
    NotExecutable { tag: VariantTag },

    #[error("Arity mismatch: expected {expected}, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("Foreign code raised: {0}")]
    ForeignRaised(ForeignError),

    #[error("Invalid {0}")]
    InvalidArgument(ArgumentError),

    #[error("Operation '{operation}' not supported on {tag} value")]
    Unsupported {
        operation: &'static str,
        tag: VariantTag,
    },

    #[error("No such member: {0}")]
    NoSuchMember(String),

    #[error("Index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Result type for bridge operations
pub type InteropResult<T> = Result<T, InteropError>;
