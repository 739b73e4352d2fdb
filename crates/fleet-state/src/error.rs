//! Error types for fleet-state

use fleet_core::{CoreError, ResourcePointer};
use thiserror::Error;

/// Result type for fleet-state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors returned by the state store and the destruction engine
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StateError {
    /// Conflicting or missing selection criteria, detected before any store call
    #[error("{0}")]
    Validation(String),

    /// Selector could not be parsed
    #[error(transparent)]
    InvalidSelector(#[from] CoreError),

    /// No resource definition matches the requested type
    #[error(
        "unknown resource type '{token}'{}",
        .suggestion.as_ref().map(|s| format!(", did you mean '{}'?", s)).unwrap_or_default()
    )]
    UnknownType {
        token: String,
        suggestion: Option<String>,
    },

    /// Several resource definitions match the requested type
    #[error("resource type '{token}' is ambiguous: {}", .candidates.join(", "))]
    AmbiguousType {
        token: String,
        candidates: Vec<String>,
    },

    /// Resource does not exist
    #[error("resource {pointer} doesn't exist")]
    NotFound { pointer: ResourcePointer },

    /// Store rejected the request given the resource's current state
    #[error("resource {pointer} conflict: {reason}")]
    Conflict {
        pointer: ResourcePointer,
        reason: String,
    },

    /// Transport or internal store failure
    #[error("state store error: {0}")]
    Transport(String),

    /// Store failure with operation context
    #[error("{operation} {pointer}: {source}")]
    Store {
        operation: &'static str,
        pointer: ResourcePointer,
        #[source]
        source: Box<StateError>,
    },

    /// Watch stream reported an error or ended unexpectedly
    #[error("watch failed: {0}")]
    Watch(String),

    /// Caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// Caller deadline passed
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

impl StateError {
    pub fn not_found(pointer: &ResourcePointer) -> Self {
        StateError::NotFound {
            pointer: pointer.clone(),
        }
    }

    pub fn conflict(pointer: &ResourcePointer, reason: impl Into<String>) -> Self {
        StateError::Conflict {
            pointer: pointer.clone(),
            reason: reason.into(),
        }
    }

    /// Attach operation and resource context
    pub fn store(operation: &'static str, pointer: &ResourcePointer, source: StateError) -> Self {
        StateError::Store {
            operation,
            pointer: pointer.clone(),
            source: Box::new(source),
        }
    }

    /// Check if this is a not found error, looking through context wrappers
    pub fn is_not_found(&self) -> bool {
        match self {
            StateError::NotFound { .. } => true,
            StateError::Store { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this is a conflict error, looking through context wrappers
    pub fn is_conflict(&self) -> bool {
        match self {
            StateError::Conflict { .. } => true,
            StateError::Store { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    /// Cancellation or deadline, as opposed to a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StateError::Cancelled | StateError::DeadlineExceeded)
    }
}
