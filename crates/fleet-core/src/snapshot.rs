//! On-disk state snapshots
//!
//! A snapshot holds the resource definition catalog and every resource of a
//! state. It is what the CLI loads into an in-memory store before running an
//! operation, and writes back afterwards.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::resource::{Resource, ResourceDefinition};

/// Serialized state: catalog plus resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub definitions: Vec<ResourceDefinition>,

    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Snapshot {
    /// Parse and validate a YAML snapshot
    pub fn from_yaml(content: &str) -> Result<Self> {
        let snapshot: Self = serde_yaml::from_str(content)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Reject duplicate definitions and duplicate resource addresses
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for def in &self.definitions {
            if !ids.insert(def.id.as_str()) {
                return Err(CoreError::DuplicateDefinition { id: def.id.clone() });
            }
        }

        let mut pointers = HashSet::new();
        for res in &self.resources {
            let ptr = res.pointer();
            if !pointers.insert(ptr.clone()) {
                return Err(CoreError::DuplicateResource {
                    pointer: ptr.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Metadata, Phase};

    const SAMPLE: &str = r#"
definitions:
  - id: ClusterMachines.omni.sidero.dev
    aliases: [ClusterMachine, cm]
    defaultNamespace: default
resources:
  - metadata:
      namespace: default
      type: ClusterMachines.omni.sidero.dev
      id: m1
      finalizers: [ClusterMachineController]
      labels:
        cluster: prod
    spec:
      kubernetesVersion: "1.30"
  - metadata:
      namespace: default
      type: ClusterMachines.omni.sidero.dev
      id: m2
      phase: tearingDown
"#;

    #[test]
    fn test_parse_sample() {
        let snapshot = Snapshot::from_yaml(SAMPLE).unwrap();

        assert_eq!(snapshot.definitions.len(), 1);
        assert_eq!(snapshot.definitions[0].aliases, vec!["ClusterMachine", "cm"]);
        assert_eq!(snapshot.resources.len(), 2);

        let m1 = &snapshot.resources[0].metadata;
        assert!(m1.finalizers.contains("ClusterMachineController"));
        assert_eq!(m1.labels.get("cluster").map(String::as_str), Some("prod"));
        assert_eq!(snapshot.resources[1].metadata.phase, Phase::TearingDown);
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let res = Resource::new(Metadata::new("default", "Machines", "m1"));
        let snapshot = Snapshot {
            definitions: vec![],
            resources: vec![res.clone(), res],
        };

        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, CoreError::DuplicateResource { .. }));
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let def = ResourceDefinition::new("Machines", "default");
        let snapshot = Snapshot {
            definitions: vec![def.clone(), def],
            resources: vec![],
        };

        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, CoreError::DuplicateDefinition { id } if id == "Machines"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.yaml");

        let snapshot = Snapshot::from_yaml(SAMPLE).unwrap();
        snapshot.save_to(&path).unwrap();

        let loaded = Snapshot::load_from(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_definitions_yaml_snapshot() {
        let snapshot = Snapshot::from_yaml(SAMPLE).unwrap();
        insta::assert_yaml_snapshot!(snapshot.definitions, @r###"
        - id: ClusterMachines.omni.sidero.dev
          aliases:
            - ClusterMachine
            - cm
          defaultNamespace: default
        "###);
    }
}
