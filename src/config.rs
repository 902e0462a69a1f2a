use secrecy::SecretString;
use serde::Deserialize;
use std::env;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::database::ConnectionConfig;
use crate::engines::mysql::DEFAULT_CONCURRENCY;
use crate::error::{ConfigError, Result};

/// Environment variable that overrides the configured password.
pub const PASSWORD_ENV: &str = "SCHEMA_SCAN_PASSWORD";

/// Supported configuration file formats.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> std::result::Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(ConfigError::Invalid(format!(
                "unrecognised configuration file extension: {}",
                path.display()
            ))),
        }
    }
}

/// Everything needed to scan one database.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfiguration {
    /// Engine tag, e.g. `mysql`. Checked by the factory, not at parse time.
    pub engine: String,

    /// Connection parameters
    pub connection: ConnectionConfig,

    /// Tables to leave out of the scan (exact, case-sensitive names)
    #[serde(default)]
    pub excludes: Vec<String>,

    /// Per-table fetches allowed in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl SourceConfiguration {
    pub fn new(engine: impl Into<String>, connection: ConnectionConfig) -> Self {
        Self {
            engine: engine.into(),
            connection,
            excludes: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = excludes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Load, resolve and validate a configuration file.
    ///
    /// The password comes from `SCHEMA_SCAN_PASSWORD` when set, then from the
    /// file, then from the variable named by `connection.password_env`.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        debug!(path = %path.display(), ?format, "Loading configuration");

        let content = fs::read_to_string(path).await?;
        let config = Self::parse(&content, format)?;
        let config = config.resolve_password(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text without touching the environment.
    pub fn parse(content: &str, format: ConfigFormat) -> std::result::Result<Self, ConfigError> {
        match format {
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| ConfigError::Invalid(format!("TOML parse error: {}", e))),
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| ConfigError::Invalid(format!("YAML parse error: {}", e))),
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::Invalid(format!("JSON parse error: {}", e))),
        }
    }

    /// Fill in the password from the environment, read through `lookup`.
    pub fn resolve_password<F>(mut self, lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup(PASSWORD_ENV) {
            self.connection.password = Some(SecretString::new(password));
            return Ok(self);
        }

        if self.connection.password.is_none() {
            if let Some(key) = &self.connection.password_env {
                let password =
                    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.clone()))?;
                self.connection.password = Some(SecretString::new(password));
            }
        }
        Ok(self)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.connection.database.is_empty() {
            return Err(ConfigError::Invalid(
                "connection.database must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
