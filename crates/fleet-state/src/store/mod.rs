//! State store contract
//!
//! The store holds every resource and implements the two-phase deletion
//! protocol: `teardown` moves a resource into the tearing down phase, and
//! `destroy` physically removes it once all finalizers are released.
//!
//! Watches push [`WatchEvent`]s into a caller supplied channel, so several
//! per-resource watches can feed one receiver.

mod memory;

pub use memory::{Call, MemoryState, OperationCounts};

use async_trait::async_trait;
use fleet_core::{LabelQuery, Resource, ResourceDefinition, ResourcePointer, WatchEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Client side view of the state store
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait State: Send + Sync {
    /// Resource definitions known to the store
    async fn resolve_catalog(&self) -> Result<Vec<ResourceDefinition>>;

    /// List resources of a type in a namespace, optionally filtered by labels
    async fn list(
        &self,
        namespace: &str,
        resource_type: &str,
        query: Option<&LabelQuery>,
    ) -> Result<Vec<Resource>>;

    /// Get a single resource
    async fn get(&self, pointer: &ResourcePointer) -> Result<Resource>;

    /// Watch a single resource
    ///
    /// The current state is sent first (`Created`, or `Destroyed` when the
    /// resource is absent), then every change until `cancel` fires or the
    /// receiver is dropped. Returns once the watch is established.
    async fn watch(
        &self,
        cancel: &CancellationToken,
        pointer: &ResourcePointer,
        events: mpsc::Sender<WatchEvent>,
    ) -> Result<()>;

    /// Watch every resource of a type in a namespace
    ///
    /// Sends `Created` for each existing match, then `Bootstrapped`, then
    /// changes to matching resources. Returns once the watch is established.
    async fn watch_kind(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        resource_type: &str,
        query: Option<&LabelQuery>,
        events: mpsc::Sender<WatchEvent>,
    ) -> Result<()>;

    /// Move a resource into the tearing down phase
    ///
    /// Returns `true` when the resource has no finalizers and can be destroyed
    /// right away. Tearing down a resource twice is not an error.
    async fn teardown(&self, pointer: &ResourcePointer) -> Result<bool>;

    /// Physically remove a torn down resource with no finalizers
    async fn destroy(&self, pointer: &ResourcePointer) -> Result<()>;
}
