//! Configuration loading and constants.
//!
//! Loads application configuration from a TOML file, applies `DBTEST_*`
//! environment overrides, and resolves the datastore secret. `AppConfig` is the
//! root configuration struct; `StoreConfig` is the immutable, fully resolved
//! view handed to the datastore connector.

use const_format::formatcp;
use serde::Deserialize;
use std::path::Path;

// =============================================================================
// Scratch Table Layout
// =============================================================================

/// Maximum length of the key column (`CHAR`)
pub const KEY_MAX_LENGTH: u16 = 64;

/// Maximum length of the value column (`VARCHAR`)
pub const VALUE_MAX_LENGTH: u16 = 16000;

pub const KEY_COLUMN_TYPE: &str = formatcp!("CHAR({})", KEY_MAX_LENGTH);

pub const VALUE_COLUMN_TYPE: &str = formatcp!("VARCHAR({})", VALUE_MAX_LENGTH);

// =============================================================================
// HTTP Response Cache Control
// =============================================================================

/// Health responses reflect a probe run at request time and must not be reused
pub const CACHE_CONTROL_HEALTH: &str = "no-store";

/// Seconds to wait for in-flight requests after a shutdown signal
pub const SHUTDOWN_DRAIN_SECS: u64 = 30;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "DBTEST";

/// Environment variable holding the datastore password unless configured otherwise
pub const DEFAULT_PASSWORD_ENV: &str = formatcp!("{}_MYSQL_PASSWORD", ENV_PREFIX);

/// Default path of the health endpoint
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Default log level when neither the CLI nor RUST_LOG provide a filter
pub const DEFAULT_LOG_LEVEL: &str = "debug";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub http: HttpServerConfig,
    /// Datastore connection settings
    pub mysql: MysqlConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    /// Path the health endpoint is mounted on
    pub health_path: String,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }
}

/// Datastore settings as written in the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MysqlConfig {
    /// `host:port` of the server
    pub address: String,
    pub username: String,
    /// Database (schema) to connect to; empty means "same as username"
    pub database_name: String,
    /// Name of the environment variable holding the password
    pub env_variable_name: String,
    /// Column used for keys in the scratch table
    pub key_name: String,
    /// Column used for values in the scratch table
    pub value_name: String,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            address: "localhost:3306".to_string(),
            username: "kvdb".to_string(),
            database_name: String::new(),
            env_variable_name: DEFAULT_PASSWORD_ENV.to_string(),
            key_name: "key".to_string(),
            value_name: "value".to_string(),
        }
    }
}

impl MysqlConfig {
    /// Effective database name (falls back to the username)
    pub fn database(&self) -> &str {
        if self.database_name.is_empty() {
            &self.username
        } else {
            &self.database_name
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "debug", "info", "warn" or "error"
    pub level: String,
    /// Log format: "text" (human-readable, default) or "json" (structured)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    /// Normalized level name; anything unrecognized becomes "info".
    pub fn level(&self) -> &'static str {
        match self.level.to_lowercase().as_str() {
            "debug" => "debug",
            "warn" => "warn",
            "error" => "error",
            _ => "info",
        }
    }

    /// `EnvFilter` directive derived from the configured level.
    pub fn filter_directive(&self) -> String {
        let level = self.level();
        format!("dbtest={level},tower_http={level}")
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Fully resolved datastore settings, immutable for the life of the process.
#[derive(Clone)]
pub struct StoreConfig {
    pub address: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub key_column: String,
    pub value_column: String,
}

impl StoreConfig {
    /// Resolve the secret through `lookup` using the configured variable name.
    ///
    /// A missing variable yields an empty password; the server decides
    /// whether that is acceptable.
    pub fn resolve<F>(mysql: &MysqlConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let password = lookup(&mysql.env_variable_name).unwrap_or_else(|| {
            tracing::warn!(
                variable = %mysql.env_variable_name,
                "Datastore password variable not set, connecting without a password"
            );
            String::new()
        });

        Self {
            address: mysql.address.clone(),
            username: mysql.username.clone(),
            password,
            database: mysql.database().to_string(),
            key_column: mysql.key_name.clone(),
            value_column: mysql.value_name.clone(),
        }
    }

    /// Resolve the secret from the process environment.
    pub fn from_env(mysql: &MysqlConfig) -> Self {
        Self::resolve(mysql, |name| std::env::var(name).ok())
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("key_column", &self.key_column)
            .field("value_column", &self.value_column)
            .finish()
    }
}

impl AppConfig {
    /// Load the config file, apply environment overrides and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&contents)?;

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Override file values with `DBTEST_<SECTION>_<FIELD>` variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}_{suffix}"));

        if let Some(host) = var("HTTP_HOST") {
            self.http.host = host;
        }
        if let Some(port) = var("HTTP_PORT") {
            self.http.port = port.parse().map_err(|_| {
                ConfigError::Validation(format!(
                    "{ENV_PREFIX}_HTTP_PORT is not a valid port: {port}"
                ))
            })?;
        }
        if let Some(path) = var("HTTP_HEALTH_PATH") {
            self.http.health_path = path;
        }

        let mysql = &mut self.mysql;
        for (suffix, field) in [
            ("MYSQL_ADDRESS", &mut mysql.address),
            ("MYSQL_USERNAME", &mut mysql.username),
            ("MYSQL_DATABASE_NAME", &mut mysql.database_name),
            ("MYSQL_ENV_VARIABLE_NAME", &mut mysql.env_variable_name),
            ("MYSQL_KEY_NAME", &mut mysql.key_name),
            ("MYSQL_VALUE_NAME", &mut mysql.value_name),
            ("LOGGING_LEVEL", &mut self.logging.level),
            ("LOGGING_FORMAT", &mut self.logging.format),
        ] {
            if let Some(value) = var(suffix) {
                *field = value;
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::Validation("http.port must not be 0".to_string()));
        }
        if !self.http.health_path.starts_with('/') || self.http.health_path == "/" {
            return Err(ConfigError::Validation(format!(
                "http.health_path must be an absolute path other than '/': {}",
                self.http.health_path
            )));
        }
        if self.mysql.key_name.is_empty() || self.mysql.value_name.is_empty() {
            return Err(ConfigError::Validation(
                "mysql.key_name and mysql.value_name must not be empty".to_string(),
            ));
        }
        if self.mysql.key_name == self.mysql.value_name {
            return Err(ConfigError::Validation(format!(
                "mysql.key_name and mysql.value_name must differ (both are {})",
                self.mysql.key_name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
