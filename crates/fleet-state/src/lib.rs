//! Fleet State - state store client and resource destruction engine
//!
//! This crate provides:
//! - `State`: the async contract of a two-phase deletion state store
//! - `MemoryState`: an in-memory store with watch fan-out and call accounting
//! - `destroy_resources`: teardown, finalizer wait and destroy of a selection
//! - `ProgressSink`: console, JSON and recording progress reporters

pub mod destroy;
pub mod error;
pub mod progress;
pub mod store;

pub use destroy::{
    Catalog, DEFAULT_WATCH_KIND_THRESHOLD, DestroyContext, DestroyOptions, DestroySummary,
    destroy_resources,
};
pub use error::{Result, StateError};
pub use progress::{
    ConsoleProgress, JsonProgress, ProgressEvent, ProgressSink, ProgressVerb, QuietProgress,
    RecordingProgress,
};
pub use store::{Call, MemoryState, OperationCounts, State};
