//! CLI configuration
//!
//! Stored in `~/.config/fleet/config.yaml`. Every field is optional and
//! command line flags take precedence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use fleet_state::DEFAULT_WATCH_KIND_THRESHOLD;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// How progress and results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    /// Styled human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// Nothing but errors
    Quiet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// State snapshot file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PathBuf>,

    #[serde(default = "default_watch_kind_threshold")]
    pub watch_kind_threshold: usize,

    /// Give up waiting for finalizers after this long
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    #[serde(default)]
    pub output: OutputFormat,
}

fn default_api_version() -> String {
    "fleet.dev/v1".to_string()
}

fn default_watch_kind_threshold() -> usize {
    DEFAULT_WATCH_KIND_THRESHOLD
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            state: None,
            watch_kind_threshold: default_watch_kind_threshold(),
            timeout: None,
            output: OutputFormat::default(),
        }
    }
}

impl FleetConfig {
    /// Load from an explicit path, or from the default location if present
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::io_with_help(
                format!("cannot read config {}: {}", path.display(), e),
                "check the --config path",
            )
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| CliError::config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// `~/.config/fleet/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fleet").join("config.yaml"))
    }

    /// Snapshot path from flag, config, or the data directory
    pub fn state_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.state.clone())
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("fleet")
                    .join("state.yaml")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = FleetConfig::default();
        assert_eq!(config.watch_kind_threshold, 10);
        assert_eq!(config.output, OutputFormat::Text);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_default_serialization() {
        insta::assert_yaml_snapshot!(FleetConfig::default(), @r"
        apiVersion: fleet.dev/v1
        watchKindThreshold: 10
        output: text
        ");
    }

    #[test]
    fn test_load_full() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            r#"
apiVersion: fleet.dev/v1
state: /var/lib/fleet/state.yaml
watchKindThreshold: 25
timeout: 2m 30s
output: json
"#,
        );

        let config = FleetConfig::load(Some(&path)).unwrap();
        assert_eq!(config.state, Some(PathBuf::from("/var/lib/fleet/state.yaml")));
        assert_eq!(config.watch_kind_threshold, 25);
        assert_eq!(config.timeout, Some(Duration::from_secs(150)));
        assert_eq!(config.output, OutputFormat::Json);
    }

    #[test]
    fn test_load_partial_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "output: quiet\n");

        let config = FleetConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api_version, "fleet.dev/v1");
        assert_eq!(config.watch_kind_threshold, DEFAULT_WATCH_KIND_THRESHOLD);
        assert_eq!(config.output, OutputFormat::Quiet);
    }

    #[test]
    fn test_missing_explicit_config_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = FleetConfig::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
    }

    #[test]
    fn test_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "timeout: soon\n");
        assert!(matches!(
            FleetConfig::load(Some(&path)),
            Err(CliError::Config { .. })
        ));
    }

    #[test]
    fn test_state_path_precedence() {
        let config = FleetConfig {
            state: Some(PathBuf::from("/from/config.yaml")),
            ..Default::default()
        };

        assert_eq!(
            config.state_path(Some(Path::new("/from/flag.yaml"))),
            PathBuf::from("/from/flag.yaml")
        );
        assert_eq!(config.state_path(None), PathBuf::from("/from/config.yaml"));
        assert!(
            FleetConfig::default()
                .state_path(None)
                .ends_with("fleet/state.yaml")
        );
    }
}
