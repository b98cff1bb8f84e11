//! Configuration file discovery and data directory resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application directory name used under the platform config/data dirs
pub const APP_DIR_NAME: &str = "cadence";

/// Config file name looked up in the platform config directories
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Locate the bootstrap configuration file.
///
/// Priority order:
/// 1. Explicit path (command-line argument or environment, resolved by the caller)
/// 2. User config directory (`~/.config/cadence/config.toml` on Linux)
/// 3. System config (`/etc/cadence/config.toml`, Linux only)
///
/// An explicit path is returned even if it does not exist, so the caller can
/// report the missing file instead of silently falling back to defaults.
/// Returns `None` when nothing is found and built-in defaults should apply.
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)) {
        if user_config.exists() {
            debug!("Using user config file {}", user_config.display());
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR_NAME).join(CONFIG_FILE_NAME);
        if system_config.exists() {
            debug!("Using system config file {}", system_config.display());
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default data folder
pub fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/cadence
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/var/lib").join(APP_DIR_NAME))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/cadence
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support").join(APP_DIR_NAME))
    } else {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("./cadence_data"))
    }
}

/// Create the parent directory of `path` if it is missing
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        Some(_) => Ok(()),
        None => Err(Error::Config(format!(
            "Path has no parent directory: {}",
            path.display()
        ))),
    }
}
