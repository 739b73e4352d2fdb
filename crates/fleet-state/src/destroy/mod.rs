//! Resource destruction
//!
//! Destroys resources through the two-phase deletion protocol:
//!
//! 1. Resolve the type token against the store catalog
//! 2. Select targets from explicit IDs, a label selector or `all`
//! 3. Establish the watch (kind-level or per resource)
//! 4. Tear every target down, destroying the ones with no finalizers
//! 5. Wait for the remaining targets to become destroy-ready and destroy them
//!
//! Nothing is rolled back on failure: resources already torn down stay
//! torn down, and re-running the same destroy finishes the job.

mod orchestrator;
mod resolve;
mod select;
mod watch;

pub use resolve::Catalog;

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, StateError};
use crate::progress::ProgressSink;
use crate::store::State;
use orchestrator::Orchestrator;
use watch::WatchStrategy;

/// Above this many explicit IDs a single kind-level watch replaces
/// per-resource watches
pub const DEFAULT_WATCH_KIND_THRESHOLD: usize = 10;

/// What to destroy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyOptions {
    /// Type token: definition ID or alias, case-insensitive
    pub resource_type: String,
    /// Namespace override; the definition's default namespace otherwise
    pub namespace: Option<String>,
    /// Label selector
    pub selector: Option<String>,
    /// Destroy every resource of the type
    pub all: bool,
    /// Explicit resource IDs
    pub ids: Vec<String>,
    pub watch_kind_threshold: usize,
}

impl DestroyOptions {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            namespace: None,
            selector: None,
            all: false,
            ids: Vec::new(),
            watch_kind_threshold: DEFAULT_WATCH_KIND_THRESHOLD,
        }
    }

    pub fn with_ids<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_watch_kind_threshold(mut self, threshold: usize) -> Self {
        self.watch_kind_threshold = threshold;
        self
    }
}

/// Cancellation and deadline for one destroy operation
#[derive(Debug, Clone, Default)]
pub struct DestroyContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl DestroyContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel through an externally owned token
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Resolves with the reason once the operation must stop
    pub(crate) async fn done(&self) -> StateError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => StateError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => StateError::DeadlineExceeded,
            },
            None => {
                self.cancel.cancelled().await;
                StateError::Cancelled
            }
        }
    }
}

/// Outcome of a finished destroy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroySummary {
    /// Resolved definition ID
    pub resource_type: String,
    pub namespace: String,
    /// IDs that had to wait for finalizers, in teardown order
    pub torn_down: Vec<String>,
    /// IDs destroyed by this operation, in destroy order
    pub destroyed: Vec<String>,
    /// IDs that were already gone
    pub skipped: Vec<String>,
}

impl DestroySummary {
    pub fn is_empty(&self) -> bool {
        self.torn_down.is_empty() && self.destroyed.is_empty() && self.skipped.is_empty()
    }
}

/// Destroy the resources described by `options`
///
/// Returns once every target is destroyed, or with the first fatal error.
/// Validation happens before any store call.
pub async fn destroy_resources<S: State + ?Sized>(
    state: &S,
    options: &DestroyOptions,
    ctx: &DestroyContext,
    progress: &dyn ProgressSink,
) -> Result<DestroySummary> {
    let criteria = select::validate(options)?;

    let catalog = Catalog::load(state).await?;
    let definition = catalog.resolve(&options.resource_type)?;
    let namespace = options
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .unwrap_or(&definition.default_namespace);
    let resource_type = definition.id.as_str();

    let targets = select::select(
        state,
        namespace,
        resource_type,
        criteria,
        options.watch_kind_threshold,
    )
    .await?;

    let summary = DestroySummary {
        resource_type: resource_type.to_string(),
        namespace: namespace.to_string(),
        ..Default::default()
    };

    if targets.ids.is_empty() {
        debug!(namespace, resource_type, "nothing to destroy");
        return Ok(summary);
    }

    // Watches end with this operation whatever the outcome
    let watch_cancel = ctx.cancellation_token().child_token();
    let _watch_guard = watch_cancel.clone().drop_guard();

    let strategy = WatchStrategy::choose(&targets);
    let events = strategy
        .establish(state, &watch_cancel, namespace, resource_type, &targets.ids)
        .await?;

    let mut outcome = Orchestrator::new(state, namespace, resource_type, progress)
        .run(&targets.ids, events, ctx)
        .await?;

    outcome.resource_type = summary.resource_type;
    outcome.namespace = summary.namespace;

    info!(
        namespace,
        resource_type,
        destroyed = outcome.destroyed.len(),
        skipped = outcome.skipped.len(),
        "destroy complete"
    );

    Ok(outcome)
}
