use crate::config::loader::PERMISSIONS_ENV;
use crate::utils::error::{PermagateError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DATABASE_URL_ENV: &str = "PERMAGATE_DATABASE_URL";
pub const MAX_CONNECTIONS_ENV: &str = "PERMAGATE_MAX_CONNECTIONS";
pub const KEEP_SCHEMA_ENV: &str = "PERMAGATE_KEEP_SCHEMA";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermagateConfig {
    #[serde(default)]
    pub permissions: PermissionsConfig,
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// `<file.toml>[:<root name>]`, same format as PERMAGATE_PERMISSIONS
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Preserve existing tables between runs instead of recreating them
    #[serde(default)]
    pub keep_schema: bool,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            keep_schema: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl PermagateConfig {
    /// Loads the configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parses the configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PermagateError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Builds a configuration purely from PERMAGATE_* environment variables
    pub fn from_env() -> Result<Self> {
        let database = match std::env::var(DATABASE_URL_ENV) {
            Ok(url) => {
                let max_connections = match std::env::var(MAX_CONNECTIONS_ENV) {
                    Ok(value) => value.parse::<u32>().map_err(|_| PermagateError::InvalidConfigValueError {
                        field: MAX_CONNECTIONS_ENV.to_string(),
                        value: value.clone(),
                        reason: "expected a positive integer".to_string(),
                    })?,
                    Err(_) => DEFAULT_MAX_CONNECTIONS,
                };
                let keep_schema = match std::env::var(KEEP_SCHEMA_ENV) {
                    Ok(value) => parse_flag(KEEP_SCHEMA_ENV, &value)?,
                    Err(_) => false,
                };
                Some(DatabaseConfig {
                    url,
                    max_connections,
                    keep_schema,
                })
            }
            Err(_) => None,
        };

        Ok(Self {
            permissions: PermissionsConfig {
                path: std::env::var(PERMISSIONS_ENV).ok(),
            },
            database,
            logging: LoggingConfig::default(),
        })
    }

    /// Replaces ${VAR} placeholders with environment values; unknown variables are left as-is
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PermagateError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn database(&self) -> Result<&DatabaseConfig> {
        validation::validate_required_field("database", &self.database)
    }

    pub fn log_format(&self) -> LogFormat {
        self.logging
            .format
            .as_deref()
            .and_then(LogFormat::parse)
            .unwrap_or_default()
    }
}

/// Parses a boolean environment flag. Anything unrecognised is an error rather than `false`.
fn parse_flag(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(PermagateError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "expected one of 1/0, true/false, yes/no, on/off".to_string(),
        }),
    }
}

impl Validate for PermagateConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.permissions.path {
            validation::validate_path("permissions.path", path)?;
        }

        if let Some(database) = &self.database {
            validation::validate_database_url("database.url", &database.url)?;
            validation::validate_positive_number(
                "database.max_connections",
                database.max_connections,
                1,
            )?;
        }

        if let Some(level) = &self.logging.level {
            validation::validate_one_of(
                "logging.level",
                level,
                &["trace", "debug", "info", "warn", "error"],
            )?;
        }

        if let Some(format) = &self.logging.format {
            validation::validate_one_of("logging.format", format, &["compact", "text", "json"])?;
        }

        Ok(())
    }
}
