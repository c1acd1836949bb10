//! Site configuration loading.
//!
//! # Responsibility
//! - Describe the boot-time configuration of one site (environment, URL,
//!   database, logging, labs overrides, host settings).
//! - Load configuration from JSON files with environment overrides.
//!
//! # Invariants
//! - `env` is never empty after loading.
//! - Unknown database clients are rejected before any connection attempt.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured `env`.
pub const ENV_OVERRIDE_VAR: &str = "PRESSROOM_ENV";
/// The only database client understood by the connection factory.
pub const SQLITE_CLIENT: &str = "sqlite3";
/// Special filename that selects an in-memory database.
pub const IN_MEMORY_FILENAME: &str = ":memory:";

const DEFAULT_ENV: &str = "development";
const DEFAULT_URL: &str = "http://localhost:2368";
const DEFAULT_DB_FILENAME: &str = "content/data/pressroom.db";

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration loading and validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Database section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_client")]
    pub client: String,
    /// File path, or `:memory:`.
    #[serde(default = "default_db_filename")]
    pub filename: String,
}

impl DatabaseConfig {
    pub fn sqlite(filename: impl Into<String>) -> Self {
        Self {
            client: SQLITE_CLIENT.to_string(),
            filename: filename.into(),
        }
    }

    pub fn in_memory() -> Self {
        Self::sqlite(IN_MEMORY_FILENAME)
    }

    pub fn is_in_memory(&self) -> bool {
        self.filename == IN_MEMORY_FILENAME
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::sqlite(DEFAULT_DB_FILENAME)
    }
}

/// Logging section. A missing `dir` logs to stderr.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EmailVerificationConfig {
    #[serde(default)]
    pub verified: bool,
}

/// Hosting-provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HostSettings {
    #[serde(default)]
    pub email_verification: Option<EmailVerificationConfig>,
}

/// Root configuration for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressroomConfig {
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Labs flag overrides; take precedence over the `labs` setting.
    #[serde(default)]
    pub labs: BTreeMap<String, bool>,
    #[serde(default, rename = "hostSettings")]
    pub host_settings: HostSettings,
}

impl PressroomConfig {
    /// Defaults for the given environment with an in-memory database.
    pub fn for_env(env: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            url: default_url(),
            database: DatabaseConfig::in_memory(),
            logging: LoggingConfig::default(),
            labs: BTreeMap::new(),
            host_settings: HostSettings::default(),
        }
    }

    /// Parses and validates a JSON document. Does not consult the process
    /// environment.
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let config: PressroomConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON config file and applies `PRESSROOM_ENV` when set.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&raw)?;
        if let Ok(env) = std::env::var(ENV_OVERRIDE_VAR) {
            config.apply_env_override(&env)?;
        }
        Ok(config)
    }

    pub fn apply_env_override(&mut self, env: &str) -> ConfigResult<()> {
        let trimmed = env.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{ENV_OVERRIDE_VAR} cannot be empty"
            )));
        }
        self.env = trimmed.to_string();
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.env.trim().is_empty() {
            return Err(ConfigError::Invalid("env cannot be empty".to_string()));
        }
        if self.url.trim().is_empty() {
            return Err(ConfigError::Invalid("url cannot be empty".to_string()));
        }
        if self.database.client != SQLITE_CLIENT {
            return Err(ConfigError::Invalid(format!(
                "unsupported database client `{}`; expected `{SQLITE_CLIENT}`",
                self.database.client
            )));
        }
        if self.database.filename.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database filename cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    /// `testing`, `testing-mysql`, ... all count.
    pub fn is_testing(&self) -> bool {
        self.env.starts_with("testing")
    }

    /// Whether the host has already verified outgoing email.
    pub fn email_verified(&self) -> bool {
        self.host_settings
            .email_verification
            .as_ref()
            .is_some_and(|verification| verification.verified)
    }
}

impl Default for PressroomConfig {
    fn default() -> Self {
        Self {
            env: default_env(),
            url: default_url(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            labs: BTreeMap::new(),
            host_settings: HostSettings::default(),
        }
    }
}

fn default_env() -> String {
    DEFAULT_ENV.to_string()
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_client() -> String {
    SQLITE_CLIENT.to_string()
}

fn default_db_filename() -> String {
    DEFAULT_DB_FILENAME.to_string()
}
