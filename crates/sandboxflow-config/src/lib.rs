pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{ProviderSettings, SettingsOverrides};

use std::path::{Path, PathBuf};

/// Environment variable naming the settings file directly
pub const CONFIG_ENV: &str = "SANDBOXFLOW_CONFIG";

const CANDIDATES: [&str; 4] = [
    "sandbox.local.yaml",
    ".sandbox.local.yaml",
    "sandbox.yaml",
    ".sandbox.yaml",
];

/// Locate the settings file
///
/// Search order:
/// 1. `SANDBOXFLOW_CONFIG`
/// 2. current directory: sandbox.local.yaml, .sandbox.local.yaml, sandbox.yaml, .sandbox.yaml
/// 3. the same names under `./.sandboxflow/`
/// 4. `~/.config/sandboxflow/sandbox.yaml`
pub fn find_settings_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = current_dir.join(".sandboxflow");
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("sandboxflow").join("sandbox.yaml");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::SettingsFileNotFound)
}

/// Load settings, apply command-line overrides and validate
///
/// `explicit` skips discovery. Without a file, settings start from defaults
/// so that flags alone can be enough.
pub fn load_settings(explicit: Option<&Path>, overrides: SettingsOverrides) -> Result<ProviderSettings> {
    let mut settings = match explicit {
        Some(path) => ProviderSettings::load(path)?,
        None => match find_settings_file() {
            Ok(path) => ProviderSettings::load(&path)?,
            Err(ConfigError::SettingsFileNotFound) => ProviderSettings::default(),
            Err(e) => return Err(e),
        },
    };

    settings.apply(overrides);
    settings.validate()?;
    Ok(settings)
}
