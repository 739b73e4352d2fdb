//! CLI command implementations

pub mod delete;
