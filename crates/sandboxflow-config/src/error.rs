use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Settings file not found. Looked in:\n\
        - current directory: sandbox.local.yaml, .sandbox.local.yaml, sandbox.yaml, .sandbox.yaml\n\
        - ./.sandboxflow/\n\
        - ~/.config/sandboxflow/sandbox.yaml\n\
        Set SANDBOXFLOW_CONFIG to point at a file directly"
    )]
    SettingsFileNotFound,

    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
