//! Watch events emitted by the state store

use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// Kind of change carried by a [`WatchEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Created,
    Updated,
    Destroyed,
    /// Initial snapshot of a kind-level watch has been delivered
    Bootstrapped,
    Noop,
    Errored,
}

/// A single change notification
///
/// `error` is set exactly when `event_type` is [`EventType::Errored`]; use the
/// constructors to keep that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WatchEvent {
    pub fn created(resource: Resource) -> Self {
        Self::with_resource(EventType::Created, resource)
    }

    pub fn updated(resource: Resource) -> Self {
        Self::with_resource(EventType::Updated, resource)
    }

    pub fn destroyed(resource: Resource) -> Self {
        Self::with_resource(EventType::Destroyed, resource)
    }

    pub fn bootstrapped() -> Self {
        Self::bare(EventType::Bootstrapped)
    }

    pub fn noop() -> Self {
        Self::bare(EventType::Noop)
    }

    pub fn errored(error: impl Into<String>) -> Self {
        Self {
            event_type: EventType::Errored,
            resource: None,
            error: Some(error.into()),
        }
    }

    fn with_resource(event_type: EventType, resource: Resource) -> Self {
        Self {
            event_type,
            resource: Some(resource),
            error: None,
        }
    }

    fn bare(event_type: EventType) -> Self {
        Self {
            event_type,
            resource: None,
            error: None,
        }
    }

    /// ID of the resource this event is about, if any
    pub fn resource_id(&self) -> Option<&str> {
        self.resource.as_ref().map(Resource::id)
    }
}
