//! Watch strategy
//!
//! One kind-level watch, or one watch per target, all feeding a single
//! channel. Must be established before the first teardown so no transition
//! to destroy-ready can be missed.

use fleet_core::{LabelQuery, ResourcePointer, WatchEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::select::Targets;
use crate::error::Result;
use crate::store::State;

/// Buffered events between the store and the orchestrator
const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WatchStrategy {
    /// Watch the whole (namespace, type), optionally label filtered
    Kind { query: Option<LabelQuery> },
    /// Watch each target individually
    PerResource,
}

impl WatchStrategy {
    pub(crate) fn choose(targets: &Targets) -> Self {
        if targets.use_watch_kind {
            WatchStrategy::Kind {
                query: targets.query.clone(),
            }
        } else {
            WatchStrategy::PerResource
        }
    }

    /// Subscribe and return the single event stream
    pub(crate) async fn establish<S: State + ?Sized>(
        &self,
        state: &S,
        cancel: &CancellationToken,
        namespace: &str,
        resource_type: &str,
        ids: &[String],
    ) -> Result<mpsc::Receiver<WatchEvent>> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        match self {
            WatchStrategy::Kind { query } => {
                debug!(namespace, resource_type, "establishing kind watch");
                state
                    .watch_kind(cancel, namespace, resource_type, query.as_ref(), tx)
                    .await?;
            }
            WatchStrategy::PerResource => {
                debug!(namespace, resource_type, count = ids.len(), "establishing per-resource watches");
                for id in ids {
                    let pointer = ResourcePointer::new(namespace, resource_type, id);
                    state.watch(cancel, &pointer, tx.clone()).await?;
                }
            }
        }

        // Only the store's watchers hold senders now, so a closed channel
        // means every watch ended
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Call, MemoryState};

    fn targets(ids: &[&str], use_watch_kind: bool) -> Targets {
        Targets {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            use_watch_kind,
            query: None,
        }
    }

    #[test]
    fn test_choose() {
        assert_eq!(
            WatchStrategy::choose(&targets(&["a"], false)),
            WatchStrategy::PerResource
        );
        assert_eq!(
            WatchStrategy::choose(&targets(&["a"], true)),
            WatchStrategy::Kind { query: None }
        );
    }

    #[tokio::test]
    async fn test_per_resource_watches_each_target() {
        let state = MemoryState::new();
        let cancel = CancellationToken::new();
        let ids = vec!["a".to_string(), "b".to_string()];

        let mut rx = WatchStrategy::PerResource
            .establish(&state, &cancel, "default", "Machines", &ids)
            .await
            .unwrap();

        assert_eq!(
            state.journal(),
            vec![
                Call::Watch(ResourcePointer::new("default", "Machines", "a")),
                Call::Watch(ResourcePointer::new("default", "Machines", "b")),
            ]
        );

        // Both initial tombstones arrive on the same stream
        let mut seen = vec![
            rx.recv().await.unwrap().resource_id().unwrap().to_string(),
            rx.recv().await.unwrap().resource_id().unwrap().to_string(),
        ];
        seen.sort();
        assert_eq!(seen, vec!["a", "b"]);

        cancel.cancel();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_kind_watch_single_subscription() {
        let state = MemoryState::new();
        let cancel = CancellationToken::new();
        let ids = vec!["a".to_string(), "b".to_string()];

        let mut rx = WatchStrategy::Kind { query: None }
            .establish(&state, &cancel, "default", "Machines", &ids)
            .await
            .unwrap();

        assert_eq!(state.operation_counts().watches, 1);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.event_type, fleet_core::EventType::Bootstrapped);
        cancel.cancel();
    }
}
