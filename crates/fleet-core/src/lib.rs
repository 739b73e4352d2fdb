//! Fleet Core - resource model shared by the fleet state client and CLI
//!
//! This crate provides the foundational types used throughout fleet:
//! - `Resource` / `Metadata`: typed, versioned records held by the state store
//! - `Phase`: the two-phase deletion lifecycle (running, tearing down)
//! - `ResourceDefinition`: catalog entries with aliases and default namespaces
//! - `WatchEvent`: change notifications emitted by store watches
//! - `LabelQuery`: label predicates for list and watch calls
//! - `Snapshot`: on-disk representation of a whole state

pub mod error;
pub mod event;
pub mod labels;
pub mod resource;
pub mod snapshot;

pub use error::{CoreError, Result};
pub use event::{EventType, WatchEvent};
pub use labels::{LabelQuery, LabelTerm};
pub use resource::{Metadata, Phase, Resource, ResourceDefinition, ResourcePointer};
pub use snapshot::Snapshot;
