//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - store, watch or unexpected failure
pub const ERROR: i32 = 1;

/// Validation error - missing or conflicting selection criteria, bad selector
pub const VALIDATION_ERROR: i32 = 2;

/// Resolution error - unknown or ambiguous resource type
pub const RESOLUTION_ERROR: i32 = 3;

/// Interrupted - cancelled or timed out; re-running resumes the deletion
pub const INTERRUPTED: i32 = 4;

/// IO error - state or config file unreadable, permission denied, etc.
pub const IO_ERROR: i32 = 5;
