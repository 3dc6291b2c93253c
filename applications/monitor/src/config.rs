/// Monitor configuration
use crate::error::{MonitorError, Result};
use earguard_limiter::LimiterConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Configuration file looked up in the working directory when no path is
/// given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub limiter: LimiterConfig,

    #[serde(default = "default_display")]
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisplaySettings {
    /// Seconds between periodic status lines while running (0 disables)
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: f64,
}

impl MonitorConfig {
    /// Load configuration, falling back to defaults on any load failure
    ///
    /// A missing or unreadable file is worth a warning but never stops the
    /// monitor; invalid values are caught later by `validate`.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

        if !path.exists() {
            warn!("No configuration at {}; using defaults", path.display());
        }

        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load {}: {}; using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Load configuration from a file and the environment
    ///
    /// Environment variables prefixed with `EARGUARD_` override file
    /// values, with `__` between nesting levels so key names keep their
    /// own underscores: `EARGUARD_LIMITER__SAFE_LEVEL=0.1`. A missing
    /// file leaves only defaults and the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = config::Config::builder();

        if path.exists() {
            settings = settings.add_source(config::File::from(path.to_path_buf()));
        }

        settings = settings.add_source(Self::env_overrides());

        let config = settings
            .build()
            .map_err(|e| MonitorError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| MonitorError::Config(e.to_string()))
    }

    fn env_overrides() -> config::Environment {
        config::Environment::with_prefix("EARGUARD")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Write this configuration as a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let rendered =
            toml::to_string_pretty(self).map_err(|e| MonitorError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, rendered)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.limiter.validate()?;

        let interval = self.display.status_interval_secs;
        if std::time::Duration::try_from_secs_f64(interval).is_err() {
            return Err(MonitorError::Config(format!(
                "Invalid status_interval_secs: {interval} (negative, not finite, or too large)"
            )));
        }

        Ok(())
    }
}

// Default values
fn default_display() -> DisplaySettings {
    DisplaySettings {
        status_interval_secs: default_status_interval_secs(),
    }
}

fn default_status_interval_secs() -> f64 {
    5.0
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            limiter: LimiterConfig::default(),
            display: default_display(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: MonitorConfig = toml::from_str("[limiter]\nthreshold = 0.5\n").unwrap();

        assert!((config.limiter.threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.limiter.stability_ticks, 3);
        assert!((config.display.status_interval_secs - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_limiter_values_fail_validation() {
        let config = MonitorConfig {
            limiter: LimiterConfig {
                safe_level: 0.9,
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_status_interval_fails_validation() {
        let config = MonitorConfig {
            display: DisplaySettings {
                status_interval_secs: -1.0,
            },
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_status_interval_fails_validation() {
        let config = MonitorConfig {
            display: DisplaySettings {
                status_interval_secs: 1e20,
            },
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_reach_nested_keys() {
        // Fed through the same source `load_from` layers on top of the
        // file, but from a supplied map instead of the process environment
        let vars = std::collections::HashMap::from([
            ("EARGUARD_LIMITER__SAFE_LEVEL".to_owned(), "0.05".to_owned()),
            ("EARGUARD_LIMITER__THRESHOLD".to_owned(), "0.5".to_owned()),
        ]);

        let config: MonitorConfig = config::Config::builder()
            .add_source(MonitorConfig::env_overrides().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!((config.limiter.safe_level - 0.05).abs() < f64::EPSILON);
        assert!((config.limiter.threshold - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = MonitorConfig {
            limiter: LimiterConfig {
                threshold: 0.6,
                safe_level: 0.3,
                ..Default::default()
            },
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = MonitorConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "limiter = not even close {{{").unwrap();

        let config = MonitorConfig::load_or_default(Some(&path));
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");

        let config = MonitorConfig::load_or_default(Some(&path));
        assert_eq!(config, MonitorConfig::default());
    }
}
