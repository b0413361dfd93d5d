//! Provider settings

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_region() -> String {
    "us-west1".to_string()
}

fn default_zone() -> String {
    "us-west1-b".to_string()
}

fn default_routing_mode() -> String {
    "REGIONAL".to_string()
}

fn default_poll_interval_secs() -> u64 {
    1
}

/// Everything the driver needs to reach the cloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Defaults to the credentials file's `project_id`
    #[serde(default)]
    pub project: Option<String>,

    /// Service account JSON key
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_zone")]
    pub zone: String,

    #[serde(default = "default_routing_mode")]
    pub routing_mode: String,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Unset waits for operations indefinitely
    #[serde(default)]
    pub max_wait_secs: Option<u64>,

    /// File whose content is returned as the sandbox access key
    #[serde(default)]
    pub access_key_path: Option<PathBuf>,

    /// Compute REST endpoint override
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            project: None,
            credentials_path: None,
            region: default_region(),
            zone: default_zone(),
            routing_mode: default_routing_mode(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: None,
            access_key_path: None,
            api_base: None,
        }
    }
}

/// Values given on the command line; `Some` wins over the file
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub project: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub region: Option<String>,
    pub zone: Option<String>,
}

impl ProviderSettings {
    pub fn from_yaml(yaml: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        let mut settings = Self::from_yaml(&yaml, path)?;
        settings.resolve_relative_paths(path.parent().unwrap_or(Path::new(".")));
        Ok(settings)
    }

    /// Paths in a settings file are relative to that file
    fn resolve_relative_paths(&mut self, base: &Path) {
        for path in [&mut self.credentials_path, &mut self.access_key_path]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn apply(&mut self, overrides: SettingsOverrides) {
        if let Some(project) = overrides.project {
            self.project = Some(project);
        }
        if let Some(path) = overrides.credentials_path {
            self.credentials_path = Some(path);
        }
        if let Some(region) = overrides.region {
            self.region = region;
        }
        if let Some(zone) = overrides.zone {
            self.zone = zone;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.credentials_path.is_none() {
            return Err(ConfigError::MissingSetting("credentials_path"));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "poll_interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.zone.starts_with(&self.region) {
            return Err(ConfigError::InvalidSetting {
                name: "zone",
                reason: format!("{} is not in region {}", self.zone, self.region),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }
}
