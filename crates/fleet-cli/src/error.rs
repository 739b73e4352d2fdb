//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use fleet_core::CoreError;
use fleet_state::StateError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Selection criteria or flags are invalid
    #[error("{message}")]
    #[diagnostic(code(fleet::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Resource type could not be resolved
    #[error("{message}")]
    #[diagnostic(code(fleet::cli::resolution))]
    Resolution {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Cancelled or timed out before every resource was destroyed
    #[error("{message}")]
    #[diagnostic(
        code(fleet::cli::interrupted),
        help("resources already torn down stay torn down; re-run the same command to finish")
    )]
    Interrupted { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(fleet::cli::io))]
    Io {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Config or state file content is invalid
    #[error("{message}")]
    #[diagnostic(code(fleet::cli::config))]
    Config { message: String },

    /// Store, watch or other failure
    #[error("{message}")]
    #[diagnostic(code(fleet::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Resolution { .. } => exit_codes::RESOLUTION_ERROR,
            CliError::Interrupted { .. } => exit_codes::INTERRUPTED,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Config { .. } => exit_codes::ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create an IO error with help text
    pub fn io_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
            help: None,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            CoreError::InvalidLabelQuery { .. } => CliError::validation(err.to_string()),
            other => CliError::config(other.to_string()),
        }
    }
}

impl From<StateError> for CliError {
    fn from(err: StateError) -> Self {
        let message = err.to_string();
        match err {
            StateError::Validation(_) => CliError::Validation {
                message,
                help: Some("pass resource IDs, --selector or --all".to_string()),
            },
            StateError::InvalidSelector(_) => CliError::Validation {
                message,
                help: Some("selectors look like 'key=value,key!=value,key,!key'".to_string()),
            },
            StateError::UnknownType { .. } => CliError::Resolution {
                message,
                help: None,
            },
            StateError::AmbiguousType { .. } => CliError::Resolution {
                message,
                help: Some("use the full resource type ID".to_string()),
            },
            _ if err.is_cancellation() => CliError::Interrupted { message },
            _ => CliError::Other { message },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
