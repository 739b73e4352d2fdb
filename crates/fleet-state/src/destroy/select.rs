//! Target selection
//!
//! Turns explicit IDs, a label selector or the "all" flag into a concrete
//! list of resource IDs, and decides whether a kind-level watch is needed.

use fleet_core::LabelQuery;
use indexmap::IndexSet;
use tracing::{debug, warn};

use super::DestroyOptions;
use crate::error::{Result, StateError};
use crate::store::State;

/// Validated selection criteria, checked before any store call
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Criteria {
    /// IDs named by the caller, deduplicated in order
    Explicit(IndexSet<String>),
    /// Everything of the type matching the query; `None` selects all
    Query(Option<LabelQuery>),
}

/// Concrete targets of one destroy operation
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Targets {
    pub ids: Vec<String>,
    pub use_watch_kind: bool,
    /// Label query to scope a kind-level watch with
    pub query: Option<LabelQuery>,
}

/// Check the selection without touching the store
pub(crate) fn validate(options: &DestroyOptions) -> Result<Criteria> {
    if !options.ids.is_empty() {
        if options.all || options.selector.is_some() {
            warn!("explicit resource IDs given, ignoring all/selector");
        }
        return Ok(Criteria::Explicit(options.ids.iter().cloned().collect()));
    }

    let query = match options.selector.as_deref() {
        Some(selector) => LabelQuery::parse_optional(selector)?,
        None => None,
    };

    match (options.all, query) {
        (false, None) => Err(StateError::Validation(
            "either resource ID or one of all/selector must be specified".to_string(),
        )),
        (true, Some(_)) => Err(StateError::Validation(
            "all and selector are mutually exclusive".to_string(),
        )),
        (true, None) => Ok(Criteria::Query(None)),
        (false, Some(query)) => Ok(Criteria::Query(Some(query))),
    }
}

/// Resolve criteria into target IDs
pub(crate) async fn select<S: State + ?Sized>(
    state: &S,
    namespace: &str,
    resource_type: &str,
    criteria: Criteria,
    watch_kind_threshold: usize,
) -> Result<Targets> {
    match criteria {
        Criteria::Explicit(ids) => {
            let use_watch_kind = ids.len() > watch_kind_threshold;
            Ok(Targets {
                ids: ids.into_iter().collect(),
                use_watch_kind,
                query: None,
            })
        }
        Criteria::Query(query) => {
            let items = state.list(namespace, resource_type, query.as_ref()).await?;
            debug!(
                namespace,
                resource_type,
                selector = %query.as_ref().map(ToString::to_string).unwrap_or_default(),
                matched = items.len(),
                "listed destroy targets"
            );
            Ok(Targets {
                ids: items.into_iter().map(|item| item.metadata.id).collect(),
                use_watch_kind: true,
                query,
            })
        }
    }
}
