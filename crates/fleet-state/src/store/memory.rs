//! In-memory state store
//!
//! Keeps resources in memory and fans change events out to every watcher's
//! own unbounded queue, so a watcher that is slow to read never loses events.
//! Used by tests and by the CLI, which loads a snapshot
//! file into it. Finalizer helpers stand in for the reconcilers that would
//! normally release finalizers on a real store.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use fleet_core::{
    LabelQuery, Metadata, Phase, Resource, ResourceDefinition, ResourcePointer, Snapshot,
    WatchEvent,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::State;
use crate::error::{Result, StateError};

/// A store call, recorded in call order for test assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ResolveCatalog,
    List {
        namespace: String,
        resource_type: String,
    },
    Get(ResourcePointer),
    Watch(ResourcePointer),
    WatchKind {
        namespace: String,
        resource_type: String,
    },
    Teardown(ResourcePointer),
    Destroy(ResourcePointer),
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub catalog: usize,
    pub lists: usize,
    pub gets: usize,
    pub watches: usize,
    pub teardowns: usize,
    pub destroys: usize,
}

impl OperationCounts {
    pub fn total(&self) -> usize {
        self.catalog + self.lists + self.gets + self.watches + self.teardowns + self.destroys
    }

    /// Calls that change the store
    pub fn mutations(&self) -> usize {
        self.teardowns + self.destroys
    }
}

#[derive(Default)]
struct Inner {
    definitions: Vec<ResourceDefinition>,
    resources: BTreeMap<ResourcePointer, Resource>,
    /// One queue per live watch
    subscribers: Vec<mpsc::UnboundedSender<WatchEvent>>,
}

impl Inner {
    /// Queue an event for every watcher, dropping watchers that went away
    fn publish(&mut self, event: WatchEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// In-memory [`State`] implementation
#[derive(Clone)]
pub struct MemoryState {
    /// Events are published and watchers registered under the write lock,
    /// so every watcher sees a gapless history
    inner: Arc<RwLock<Inner>>,
    journal: Arc<RwLock<Vec<Call>>>,
}

impl MemoryState {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            journal: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create a store pre-populated from a snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let state = Self::new();
        {
            let mut inner = state.inner.write().unwrap();
            inner.definitions = snapshot.definitions;
            for resource in snapshot.resources {
                inner.resources.insert(resource.pointer(), resource);
            }
        }
        state
    }

    /// Export the current contents
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.read().unwrap();
        Snapshot {
            definitions: inner.definitions.clone(),
            resources: inner.resources.values().cloned().collect(),
        }
    }

    /// Register resource definitions (builder style)
    pub fn with_definitions(self, definitions: impl IntoIterator<Item = ResourceDefinition>) -> Self {
        self.inner.write().unwrap().definitions.extend(definitions);
        self
    }

    /// Create a resource, emitting a `Created` event
    pub fn create(&self, mut resource: Resource) -> Result<()> {
        let pointer = resource.pointer();
        let mut inner = self.inner.write().unwrap();
        if inner.resources.contains_key(&pointer) {
            return Err(StateError::conflict(&pointer, "resource already exists"));
        }
        if resource.metadata.version == 0 {
            resource.metadata.version = 1;
        }
        inner.publish(WatchEvent::created(resource.clone()));
        inner.resources.insert(pointer, resource);
        Ok(())
    }

    /// Put a finalizer on a running resource, emitting an `Updated` event
    pub fn add_finalizer(&self, pointer: &ResourcePointer, finalizer: &str) -> Result<()> {
        self.mutate(pointer, |metadata| {
            if metadata.phase == Phase::TearingDown {
                return Err(StateError::conflict(pointer, "resource is being torn down"));
            }
            Ok(metadata.finalizers.insert(finalizer.to_string()))
        })
    }

    /// Release a finalizer, emitting an `Updated` event
    pub fn remove_finalizer(&self, pointer: &ResourcePointer, finalizer: &str) -> Result<()> {
        self.mutate(pointer, |metadata| Ok(metadata.finalizers.remove(finalizer)))
    }

    /// Send an `Errored` event to every active watcher
    pub fn inject_watch_error(&self, message: impl Into<String>) {
        self.inner
            .write()
            .unwrap()
            .publish(WatchEvent::errored(message));
    }

    /// Look at a resource without recording a call
    pub fn peek(&self, pointer: &ResourcePointer) -> Option<Resource> {
        self.inner.read().unwrap().resources.get(pointer).cloned()
    }

    /// Count stored resources
    pub fn resource_count(&self) -> usize {
        self.inner.read().unwrap().resources.len()
    }

    /// Number of live watch subscriptions
    pub fn watcher_count(&self) -> usize {
        let inner = self.inner.read().unwrap();
        inner.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }

    /// Calls made so far, in order
    pub fn journal(&self) -> Vec<Call> {
        self.journal.read().unwrap().clone()
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        let mut counts = OperationCounts::default();
        for call in self.journal.read().unwrap().iter() {
            match call {
                Call::ResolveCatalog => counts.catalog += 1,
                Call::List { .. } => counts.lists += 1,
                Call::Get(_) => counts.gets += 1,
                Call::Watch(_) | Call::WatchKind { .. } => counts.watches += 1,
                Call::Teardown(_) => counts.teardowns += 1,
                Call::Destroy(_) => counts.destroys += 1,
            }
        }
        counts
    }

    /// Reset the call journal
    pub fn reset_counts(&self) {
        self.journal.write().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.journal.write().unwrap().push(call);
    }

    /// Apply a metadata change; emits `Updated` when `change` reports a modification
    fn mutate<F>(&self, pointer: &ResourcePointer, change: F) -> Result<()>
    where
        F: FnOnce(&mut Metadata) -> Result<bool>,
    {
        let mut inner = self.inner.write().unwrap();
        let resource = inner
            .resources
            .get_mut(pointer)
            .ok_or_else(|| StateError::not_found(pointer))?;

        if change(&mut resource.metadata)? {
            resource.metadata.touch();
            let event = WatchEvent::updated(resource.clone());
            inner.publish(event);
        }
        Ok(())
    }

    /// Register a watcher whose queue starts with `initial`
    fn subscribe_with<F>(&self, initial: F) -> mpsc::UnboundedReceiver<WatchEvent>
    where
        F: FnOnce(&Inner) -> Vec<WatchEvent>,
    {
        let mut inner = self.inner.write().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        for event in initial(&inner) {
            let _ = tx.send(event);
        }
        inner.subscribers.push(tx);
        rx
    }
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl State for MemoryState {
    async fn resolve_catalog(&self) -> Result<Vec<ResourceDefinition>> {
        self.record(Call::ResolveCatalog);
        Ok(self.inner.read().unwrap().definitions.clone())
    }

    async fn list(
        &self,
        namespace: &str,
        resource_type: &str,
        query: Option<&LabelQuery>,
    ) -> Result<Vec<Resource>> {
        self.record(Call::List {
            namespace: namespace.to_string(),
            resource_type: resource_type.to_string(),
        });

        let inner = self.inner.read().unwrap();
        Ok(inner
            .resources
            .values()
            .filter(|r| in_kind(r, namespace, resource_type, query))
            .cloned()
            .collect())
    }

    async fn get(&self, pointer: &ResourcePointer) -> Result<Resource> {
        self.record(Call::Get(pointer.clone()));
        self.peek(pointer)
            .ok_or_else(|| StateError::not_found(pointer))
    }

    async fn watch(
        &self,
        cancel: &CancellationToken,
        pointer: &ResourcePointer,
        events: mpsc::Sender<WatchEvent>,
    ) -> Result<()> {
        self.record(Call::Watch(pointer.clone()));

        let rx = self.subscribe_with(|inner| {
            let event = match inner.resources.get(pointer) {
                Some(resource) => WatchEvent::created(resource.clone()),
                None => WatchEvent::destroyed(tombstone(pointer)),
            };
            vec![event]
        });

        let target = pointer.clone();
        spawn_forwarder(cancel.clone(), rx, events, move |resource| {
            resource.metadata.id == target.id
                && resource.metadata.resource_type == target.resource_type
                && resource.metadata.namespace == target.namespace
        });
        Ok(())
    }

    async fn watch_kind(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        resource_type: &str,
        query: Option<&LabelQuery>,
        events: mpsc::Sender<WatchEvent>,
    ) -> Result<()> {
        self.record(Call::WatchKind {
            namespace: namespace.to_string(),
            resource_type: resource_type.to_string(),
        });

        let rx = self.subscribe_with(|inner| {
            inner
                .resources
                .values()
                .filter(|r| in_kind(r, namespace, resource_type, query))
                .cloned()
                .map(WatchEvent::created)
                .chain(std::iter::once(WatchEvent::bootstrapped()))
                .collect()
        });

        let namespace = namespace.to_string();
        let resource_type = resource_type.to_string();
        let query = query.cloned();
        spawn_forwarder(cancel.clone(), rx, events, move |resource| {
            in_kind(resource, &namespace, &resource_type, query.as_ref())
        });
        Ok(())
    }

    async fn teardown(&self, pointer: &ResourcePointer) -> Result<bool> {
        self.record(Call::Teardown(pointer.clone()));

        let mut inner = self.inner.write().unwrap();
        let resource = inner
            .resources
            .get_mut(pointer)
            .ok_or_else(|| StateError::not_found(pointer))?;

        let destroy_ready = resource.metadata.finalizers.is_empty();
        if resource.metadata.phase == Phase::Running {
            resource.metadata.phase = Phase::TearingDown;
            resource.metadata.touch();
            debug!(%pointer, finalizers = resource.metadata.finalizers.len(), "resource tearing down");
            let event = WatchEvent::updated(resource.clone());
            inner.publish(event);
        }

        Ok(destroy_ready)
    }

    async fn destroy(&self, pointer: &ResourcePointer) -> Result<()> {
        self.record(Call::Destroy(pointer.clone()));

        let mut inner = self.inner.write().unwrap();
        let resource = inner
            .resources
            .get(pointer)
            .ok_or_else(|| StateError::not_found(pointer))?;

        if resource.metadata.phase != Phase::TearingDown {
            return Err(StateError::conflict(pointer, "resource is not being torn down"));
        }
        if !resource.metadata.finalizers.is_empty() {
            let pending: Vec<&str> = resource.metadata.finalizers.iter().map(String::as_str).collect();
            return Err(StateError::conflict(
                pointer,
                format!("finalizers still pending: {}", pending.join(", ")),
            ));
        }

        if let Some(removed) = inner.resources.remove(pointer) {
            debug!(%pointer, "resource destroyed");
            inner.publish(WatchEvent::destroyed(removed));
        }
        Ok(())
    }
}

fn in_kind(resource: &Resource, namespace: &str, resource_type: &str, query: Option<&LabelQuery>) -> bool {
    resource.metadata.namespace == namespace
        && resource.metadata.resource_type == resource_type
        && query.is_none_or(|q| q.matches(&resource.metadata.labels))
}

/// Placeholder carried by the `Destroyed` event a watch sends for a missing resource
fn tombstone(pointer: &ResourcePointer) -> Resource {
    Resource::new(Metadata::new(&pointer.namespace, &pointer.resource_type, &pointer.id))
}

/// Move queued events that concern this watch into `events` until cancelled
fn spawn_forwarder<F>(
    cancel: CancellationToken,
    mut rx: mpsc::UnboundedReceiver<WatchEvent>,
    events: mpsc::Sender<WatchEvent>,
    relevant: F,
) where
    F: Fn(&Resource) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return,
                received = rx.recv() => match received {
                    Some(event) => event,
                    None => return,
                },
            };

            // Events without a resource (errors, noops) go to every watcher
            let wanted = event.resource.as_ref().is_none_or(|r| relevant(r));
            if wanted && !forward(&cancel, &events, event).await {
                return;
            }
        }
    });
}

/// Send one event; false once the watch should stop
async fn forward(
    cancel: &CancellationToken,
    events: &mpsc::Sender<WatchEvent>,
    event: WatchEvent,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}
