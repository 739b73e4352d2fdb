//! Resources, metadata and the resource definition catalog
//!
//! A resource is identified by the `(namespace, type, id)` triple. Its
//! lifecycle is owned by the state store and by the reconcilers that hold
//! finalizers on it; clients only observe it and ask for teardown/destroy.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a resource
///
/// Phases only move forward: `Running` → `TearingDown` → removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Running,
    TearingDown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Running => write!(f, "running"),
            Phase::TearingDown => write!(f, "tearingDown"),
        }
    }
}

/// Fully qualified address of a single resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourcePointer {
    pub namespace: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ResourcePointer {
    pub fn new(
        namespace: impl Into<String>,
        resource_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourcePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.resource_type, self.id)
    }
}

/// Resource metadata as reported by the state store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub namespace: String,

    #[serde(rename = "type")]
    pub resource_type: String,

    pub id: String,

    /// Bumped by the store on every mutation
    #[serde(default)]
    pub version: u64,

    #[serde(default)]
    pub phase: Phase,

    /// Tokens held by reconcilers; the resource cannot be destroyed until empty
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub finalizers: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated: DateTime<Utc>,
}

impl Metadata {
    /// Create metadata for a fresh running resource
    pub fn new(
        namespace: impl Into<String>,
        resource_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            namespace: namespace.into(),
            resource_type: resource_type.into(),
            id: id.into(),
            version: 1,
            phase: Phase::Running,
            finalizers: BTreeSet::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            created: now,
            updated: now,
        }
    }

    /// Add a label (builder style)
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add a finalizer (builder style)
    pub fn with_finalizer(mut self, finalizer: impl Into<String>) -> Self {
        self.finalizers.insert(finalizer.into());
        self
    }

    /// Address of this resource
    pub fn pointer(&self) -> ResourcePointer {
        ResourcePointer::new(&self.namespace, &self.resource_type, &self.id)
    }

    /// Tearing down with no finalizers left
    pub fn is_destroy_ready(&self) -> bool {
        self.phase == Phase::TearingDown && self.finalizers.is_empty()
    }

    /// Record a mutation
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated = Utc::now();
    }
}

/// A resource record: metadata plus an opaque, type-specific spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub metadata: Metadata,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub spec: serde_json::Value,
}

impl Resource {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            spec: serde_json::Value::Null,
        }
    }

    pub fn with_spec(mut self, spec: serde_json::Value) -> Self {
        self.spec = spec;
        self
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn pointer(&self) -> ResourcePointer {
        self.metadata.pointer()
    }
}

/// Catalog entry describing a resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    /// Canonical type name
    pub id: String,

    /// Alternative names, matched case-insensitively
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    pub default_namespace: String,
}

impl ResourceDefinition {
    pub fn new(id: impl Into<String>, default_namespace: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            aliases: Vec::new(),
            default_namespace: default_namespace.into(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// All names this definition answers to, canonical ID first
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destroy_ready_requires_teardown_and_no_finalizers() {
        let mut md = Metadata::new("default", "Machines", "m1").with_finalizer("ctrl");
        assert!(!md.is_destroy_ready());

        md.phase = Phase::TearingDown;
        assert!(!md.is_destroy_ready());

        md.finalizers.clear();
        assert!(md.is_destroy_ready());
    }

    #[test]
    fn test_running_without_finalizers_is_not_destroy_ready() {
        let md = Metadata::new("default", "Machines", "m1");
        assert!(!md.is_destroy_ready());
    }

    #[test]
    fn test_touch_bumps_version() {
        let mut md = Metadata::new("default", "Machines", "m1");
        md.touch();
        md.touch();
        assert_eq!(md.version, 3);
    }

    #[test]
    fn test_pointer_display() {
        let ptr = ResourcePointer::new("default", "ClusterMachines.omni", "m1");
        assert_eq!(ptr.to_string(), "default/ClusterMachines.omni/m1");
    }

    #[test]
    fn test_definition_names_id_first() {
        let def = ResourceDefinition::new("ClusterMachines.omni.sidero.dev", "default")
            .with_aliases(["ClusterMachine", "cm"]);

        let names: Vec<&str> = def.names().collect();
        assert_eq!(names, vec!["ClusterMachines.omni.sidero.dev", "ClusterMachine", "cm"]);
    }

    #[test]
    fn test_metadata_yaml_defaults() {
        let yaml = "namespace: default\ntype: Machines\nid: m1\n";
        let md: Metadata = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(md.phase, Phase::Running);
        assert_eq!(md.version, 0);
        assert!(md.finalizers.is_empty());
    }

    #[test]
    fn test_phase_serializes_camel_case() {
        let yaml = serde_yaml::to_string(&Phase::TearingDown).unwrap();
        assert_eq!(yaml.trim(), "tearingDown");
    }
}
