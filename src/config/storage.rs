use crate::config::schema::AppConfig;
use crate::error::{RehearseError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file location.
pub fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("rehearse"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

/// Load configuration from `path`. A missing file yields the defaults
/// without writing anything; an unreadable or malformed file is an error,
/// so a typo never gets silently replaced on disk.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::debug!("No config at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| RehearseError::Config(format!("cannot read {:?}: {}", path, e)))?;
    Ok(toml::from_str(&content)?)
}

/// Persist `config` to `path`, creating parent directories as needed.
pub fn save_to(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RehearseError::Config(format!("cannot create {:?}: {}", parent, e)))?;
    }
    fs::write(path, toml::to_string_pretty(config)?)
        .map_err(|e| RehearseError::Config(format!("cannot write {:?}: {}", path, e)))?;
    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

/// Load from the default location.
pub fn load_config() -> Result<AppConfig> {
    load_from(&get_config_path())
}

/// Save to the default location.
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_to(&get_config_path(), config)
}
