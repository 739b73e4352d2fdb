//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid label query '{query}': {message}")]
    InvalidLabelQuery { query: String, message: String },

    #[error("Failed to parse state snapshot: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate resource {pointer} in snapshot")]
    DuplicateResource { pointer: String },

    #[error("duplicate resource definition '{id}' in snapshot")]
    DuplicateDefinition { id: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
