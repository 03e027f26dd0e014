use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::domain::csv::ConversionConfig;
use crate::domain::error::{AppError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "csv-sections.toml";
pub const ENV_PREFIX: &str = "CSV_SECTIONS_";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1))]
    pub port: u16,

    /// `tracing_subscriber` filter directive, overridden by `RUST_LOG`
    pub log_filter: String,

    pub conversion: ConversionConfig,

    #[validate(nested)]
    pub sessions: SessionLimits,
}

/// Bounds on the HTTP host's in-memory session map
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SessionLimits {
    #[validate(range(min = 1))]
    pub max_sessions: usize,

    /// Sessions untouched for longer than this are dropped
    #[validate(range(min = 1))]
    pub idle_timeout_secs: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 64,
            idle_timeout_secs: 30 * 60,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            log_filter: "info".to_string(),
            conversion: ConversionConfig::default(),
            sessions: SessionLimits::default(),
        }
    }
}

/// Loads configuration from defaults, an optional TOML file, and the environment
pub struct ConfigService {
    config_path: PathBuf,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::with_path(DEFAULT_CONFIG_FILE)
    }

    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<AppConfig> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(&self.config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        config
            .validate()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        config
            .conversion
            .check()
            .map_err(AppError::ConfigError)?;

        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = ConfigService::with_path("/no/such/csv-sections.toml")
            .load()
            .unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.conversion.header_prefix_bytes, 16 * 1024);
        assert_eq!(config.conversion.default_section_name, "main");
        assert_eq!(config.sessions.max_sessions, 64);
        assert_eq!(config.sessions.idle_timeout_secs, 1800);
    }

    #[test]
    fn test_toml_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "port = 4100\n\n[conversion]\ndefault_section_name = \"body\"\npreview_table_rows = 5"
        )
        .unwrap();

        let config = ConfigService::with_path(file.path()).load().unwrap();
        assert_eq!(config.port, 4100);
        assert_eq!(config.conversion.default_section_name, "body");
        assert_eq!(config.conversion.preview_table_rows, 5);
        assert_eq!(config.conversion.preview_json_rows, 50);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[conversion]\npreview_json_rows = 0").unwrap();

        let err = ConfigService::with_path(file.path()).load().unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_zero_session_cap_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[sessions]\nmax_sessions = 0").unwrap();

        let err = ConfigService::with_path(file.path()).load().unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
