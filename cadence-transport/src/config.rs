//! Configuration management for cadence-transport
//!
//! Bootstrap configuration comes from a single TOML file. Every value has a
//! built-in default, so a missing file or a partial file is fine.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--config`, `--database`)
//! 2. Environment variables (`CADENCE_CONFIG`, `CADENCE_DATABASE`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! ```toml
//! database_path = "/var/lib/cadence/transport.db"
//!
//! [logging]
//! level = "debug"
//!
//! [transport]
//! seek_step_ms = 5000
//! seek_step_fraction = 0.05
//! time_marks_ms = [30000]
//!
//! [engine]
//! tick_ms = 250
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TomlConfig {
    /// Path to SQLite database holding the session snapshot
    ///
    /// Default: `<data dir>/cadence/transport.db`
    pub database_path: Option<PathBuf>,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Transport command tuning
    pub transport: TransportSettings,

    /// Built-in clock engine tuning
    pub engine: EngineSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Step sizes and bounds for transport commands
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportSettings {
    /// Absolute seek step for seek forward/backward (ms)
    pub seek_step_ms: u64,
    /// Relative seek step as a fraction of the item duration
    pub seek_step_fraction: f64,

    pub volume_min: f64,
    pub volume_max: f64,
    pub volume_step: f64,
    /// Volume of a fresh session (no snapshot)
    pub initial_volume: f64,

    /// Balance step; balance bounds are fixed at [-1.0, 1.0]
    pub balance_step: f64,

    pub rate_min: f64,
    pub rate_max: f64,

    /// Listening-time marks reported once per item (ms)
    pub time_marks_ms: Vec<u64>,

    /// EventBus buffer per subscriber
    pub event_capacity: usize,
    /// Command channel buffer of the transport service
    pub command_capacity: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            seek_step_ms: 10_000,
            seek_step_fraction: 0.05,
            volume_min: 0.0,
            volume_max: 1.0,
            volume_step: 0.1,
            initial_volume: 0.5,
            balance_step: 0.1,
            rate_min: 0.25,
            rate_max: 4.0,
            time_marks_ms: Vec::new(),
            event_capacity: 256,
            command_capacity: 64,
        }
    }
}

impl TransportSettings {
    /// Reject values that would break transport invariants
    pub fn validate(&self) -> Result<()> {
        if self.seek_step_ms == 0 {
            return Err(Error::Config("seek_step_ms must be greater than 0".to_string()));
        }
        if !(self.seek_step_fraction > 0.0 && self.seek_step_fraction <= 1.0) {
            return Err(Error::Config(format!(
                "seek_step_fraction must be in (0, 1], got {}",
                self.seek_step_fraction
            )));
        }
        check_bounds("volume", self.volume_min, self.volume_max, self.volume_step)?;
        if !(self.volume_min..=self.volume_max).contains(&self.initial_volume) {
            return Err(Error::Config(format!(
                "initial_volume {} outside [{}, {}]",
                self.initial_volume, self.volume_min, self.volume_max
            )));
        }
        check_bounds("balance", -1.0, 1.0, self.balance_step)?;
        if self.rate_min <= 0.0 {
            return Err(Error::Config(format!("rate_min must be positive, got {}", self.rate_min)));
        }
        check_bounds("rate", self.rate_min, self.rate_max, 1.0)?;
        if !(self.rate_min..=self.rate_max).contains(&1.0) {
            return Err(Error::Config("rate bounds must include 1.0".to_string()));
        }
        if self.event_capacity == 0 || self.command_capacity == 0 {
            return Err(Error::Config("channel capacities must be greater than 0".to_string()));
        }
        Ok(())
    }
}

fn check_bounds(name: &str, min: f64, max: f64, step: f64) -> Result<()> {
    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Err(Error::Config(format!("{} bounds must be finite", name)));
    }
    if min >= max {
        return Err(Error::Config(format!("{} min {} must be below max {}", name, min, max)));
    }
    if step <= 0.0 {
        return Err(Error::Config(format!("{} step must be positive, got {}", name, step)));
    }
    Ok(())
}

/// Clock engine settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Position update interval (ms)
    pub tick_ms: u64,
    /// Duration assumed for items without a duration hint (ms); 0 fails such items
    pub default_duration_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            default_duration_ms: 180_000,
        }
    }
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: TomlConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `path` if given, otherwise from the platform lookup, otherwise defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match cadence_common::config::locate_config_file(explicit) {
            Some(path) => Self::load(&path),
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.transport.validate()?;
        if self.engine.tick_ms == 0 {
            return Err(Error::Config("engine tick_ms must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Database path, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| cadence_common::config::default_data_dir().join("transport.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = TomlConfig::default();
        config.validate().unwrap();
        assert_eq!(config.transport.seek_step_ms, 10_000);
        assert_eq!(config.transport.initial_volume, 0.5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
            database_path = "/tmp/cadence-test.db"

            [transport]
            seek_step_ms = 5000
            time_marks_ms = [30000, 60000]
            "#,
        );

        let config = TomlConfig::load(file.path()).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/cadence-test.db"));
        assert_eq!(config.transport.seek_step_ms, 5000);
        assert_eq!(config.transport.time_marks_ms, vec![30000, 60000]);
        assert_eq!(config.transport.seek_step_fraction, 0.05);
        assert_eq!(config.engine, EngineSettings::default());
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        let file = write_config("[transport]\nseek_step_fraction = 1.5\n");
        let err = TomlConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_inverted_volume_bounds_rejected() {
        let settings = TransportSettings {
            volume_min: 1.0,
            volume_max: 0.0,
            ..TransportSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_non_positive_rate_min_rejected() {
        let settings = TransportSettings {
            rate_min: 0.0,
            ..TransportSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let file = write_config("[transport\nseek_step_ms = ");
        let err = TomlConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)), "got {:?}", err);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = TomlConfig::load_or_default(Some(Path::new("/nonexistent/cadence.toml")));
        assert!(result.is_err());
    }
}
