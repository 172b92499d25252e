use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Optional defaults, read from ~/.config/mailcal/config.toml
///
/// Every key can be overridden on the command line.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Ignore events that ended more than this many days ago
    pub past_days: Option<u32>,

    /// Ignore events starting more than this many days ahead
    pub future_days: Option<u32>,

    /// Add a reminder to upcoming events
    #[serde(default)]
    pub add_alarm: bool,

    /// Repair double-encoded UTF-8 calendar parts
    #[serde(default)]
    pub broken_utf8: bool,

    /// Where to keep the per-mailbox caches
    pub cache_dir: Option<String>,
}

/// Get the config directory path (~/.config/mailcal)
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("mailcal");
    Ok(config_dir)
}

/// Get the config file path (~/.config/mailcal/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from `explicit`, or from the default location if it exists.
///
/// A file named explicitly must exist; the default one is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = config_path()?;
            if !path.exists() {
                return Ok(Config::default());
            }
            path
        }
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;

    parse_config(&contents)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))
}

fn parse_config(contents: &str) -> Result<Config> {
    Ok(toml::from_str(contents)?)
}

/// Expand ~ in paths to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
