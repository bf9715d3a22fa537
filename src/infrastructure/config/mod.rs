//! Application configuration.
//!
//! Sources, lowest to highest precedence: built-in defaults, a TOML file,
//! then `EQUIPMENT_*` environment variables (nested keys use `__`, e.g.
//! `EQUIPMENT_REPORT__COMPRESS=false`). A `.env` file is read first.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::report_style::ReportStyle;

pub const DEFAULT_CONFIG_FILE: &str = "equipment-analytics.toml";
pub const ENV_PREFIX: &str = "EQUIPMENT_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,

    /// Datasets kept per owner
    #[validate(range(min = 1))]
    pub retention_limit: usize,

    #[validate(range(min = 1))]
    pub report_sample_rows: usize,

    #[validate(range(min = 1))]
    pub max_upload_bytes: usize,

    pub log_filter: String,

    #[validate(nested)]
    pub report: ReportStyle,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("equipment_analytics.db"),
            retention_limit: 5,
            report_sample_rows: 20,
            max_upload_bytes: 10 * 1024 * 1024,
            log_filter: "info".to_string(),
            report: ReportStyle::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from `equipment-analytics.toml` in the working
    /// directory when it exists. An explicit path that is missing is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        if let Some(path) = path {
            if !path.exists() {
                return Err(AppError::ConfigError(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }

        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::from_figment(Self::figment(&file).merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Defaults layered under a TOML file. A missing file contributes nothing.
    pub fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::file(file))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract::<AppConfig>()
            .map_err(|e| AppError::ConfigError(e.to_string()))?
            .validated()
    }

    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        Ok(self)
    }
}
