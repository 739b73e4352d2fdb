//! Teardown/destroy orchestration
//!
//! Tears down every target, then consumes the watch stream until each torn
//! down resource has been destroyed. Finalizers are released by reconcilers
//! outside this process; the orchestrator only reacts to the resulting
//! events.

use std::collections::HashMap;

use fleet_core::{EventType, Resource, ResourcePointer, WatchEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{DestroyContext, DestroySummary};
use crate::error::{Result, StateError};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::store::State;

/// Where a pending resource is in its teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    /// Torn down, waiting for finalizers to be released
    TornDown,
    /// Destroy requested, waiting for the `Destroyed` event
    DestroyIssued,
}

pub(crate) struct Orchestrator<'a, S: ?Sized> {
    state: &'a S,
    namespace: &'a str,
    resource_type: &'a str,
    progress: &'a dyn ProgressSink,
    /// Only shrinks once the wait loop starts
    pending: HashMap<String, Lifecycle>,
    summary: DestroySummary,
}

impl<'a, S: State + ?Sized> Orchestrator<'a, S> {
    pub(crate) fn new(
        state: &'a S,
        namespace: &'a str,
        resource_type: &'a str,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            state,
            namespace,
            resource_type,
            progress,
            pending: HashMap::new(),
            summary: DestroySummary::default(),
        }
    }

    /// Drive every target to destruction
    ///
    /// The watch behind `events` must already be established.
    pub(crate) async fn run(
        mut self,
        ids: &[String],
        mut events: mpsc::Receiver<WatchEvent>,
        ctx: &DestroyContext,
    ) -> Result<DestroySummary> {
        for id in ids {
            self.teardown(id).await?;
        }

        while !self.pending.is_empty() {
            let event = tokio::select! {
                biased;
                err = ctx.done() => {
                    warn!(
                        resource_type = self.resource_type,
                        pending = self.pending.len(),
                        "destroy interrupted, resources left tearing down"
                    );
                    return Err(err);
                }
                event = events.recv() => event,
            };

            match event {
                Some(event) => self.handle(event).await?,
                None => {
                    return Err(StateError::Watch(format!(
                        "watch closed with {} resource(s) still pending",
                        self.pending.len()
                    )));
                }
            }
        }

        Ok(self.summary)
    }

    async fn teardown(&mut self, id: &str) -> Result<()> {
        let pointer = self.pointer(id);

        let destroy_ready = match self.state.teardown(&pointer).await {
            Ok(ready) => ready,
            Err(e) if e.is_not_found() => {
                debug!(%pointer, "resource already gone, skipping teardown");
                self.summary.skipped.push(id.to_string());
                return Ok(());
            }
            Err(e) => return Err(StateError::store("teardown", &pointer, e)),
        };

        if destroy_ready {
            self.destroy(&pointer).await
        } else {
            self.pending.insert(id.to_string(), Lifecycle::TornDown);
            self.summary.torn_down.push(id.to_string());
            self.progress
                .report(&ProgressEvent::torn_down(self.resource_type, id));
            Ok(())
        }
    }

    async fn destroy(&mut self, pointer: &ResourcePointer) -> Result<()> {
        match self.state.destroy(pointer).await {
            Ok(()) => {
                info!(%pointer, "resource destroyed");
                self.summary.destroyed.push(pointer.id.clone());
                self.progress
                    .report(&ProgressEvent::destroyed(self.resource_type, &pointer.id));
                Ok(())
            }
            // Someone else got there first
            Err(e) if e.is_not_found() => {
                debug!(%pointer, "resource already destroyed");
                Ok(())
            }
            Err(e) => Err(StateError::store("destroy", pointer, e)),
        }
    }

    async fn handle(&mut self, event: WatchEvent) -> Result<()> {
        match event.event_type {
            EventType::Errored => Err(StateError::Watch(
                event
                    .error
                    .unwrap_or_else(|| "watch reported an error".to_string()),
            )),
            EventType::Bootstrapped | EventType::Noop => Ok(()),
            EventType::Destroyed => {
                if let Some(resource) = event.resource.filter(|r| self.owns(r))
                    && self.pending.remove(resource.id()).is_some()
                {
                    debug!(id = resource.id(), remaining = self.pending.len(), "destroy observed");
                }
                Ok(())
            }
            EventType::Created | EventType::Updated => {
                let Some(resource) = event.resource else {
                    return Ok(());
                };
                if !self.owns(&resource) || !resource.metadata.is_destroy_ready() {
                    return Ok(());
                }

                if self.pending.get(resource.id()) == Some(&Lifecycle::TornDown) {
                    let pointer = self.pointer(resource.id());
                    self.destroy(&pointer).await?;
                    self.pending
                        .insert(resource.id().to_string(), Lifecycle::DestroyIssued);
                }
                Ok(())
            }
        }
    }

    fn owns(&self, resource: &Resource) -> bool {
        resource.metadata.namespace == self.namespace
            && resource.metadata.resource_type == self.resource_type
    }

    fn pointer(&self, id: &str) -> ResourcePointer {
        ResourcePointer::new(self.namespace, self.resource_type, id)
    }
}
