use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Name reported by `/health`
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

/// Connection target, credentials, timeouts, pool sizing and retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    /// Database name
    #[serde(default = "default_db_name")]
    pub name: String,
    #[serde(default = "default_db_username")]
    pub username: String,
    #[serde(default = "default_db_password")]
    pub password: String,
    /// Upper bound for opening one physical connection, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Overall deadline for one query including retries, in seconds
    #[serde(default = "default_query_timeout")]
    pub query_timeout_seconds: u64,
    /// Number of warm connections kept idle
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// Extra transient connections allowed beyond `pool_size`
    #[serde(default = "default_max_overflow")]
    pub max_overflow: u32,
    /// Connections older than this are replaced on checkout (0 disables)
    #[serde(default = "default_pool_recycle")]
    pub pool_recycle_seconds: u64,
    /// Validate idle connections with a ping before handing them out
    #[serde(default = "default_pool_pre_ping")]
    pub pool_pre_ping: bool,
    /// How long `acquire` waits for a free slot, in seconds
    #[serde(default = "default_pool_timeout")]
    pub pool_timeout_seconds: u64,
    /// Additional attempts after a transient failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between attempts, in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3030
}

fn default_service_name() -> String {
    "dbstatus-service".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_name() -> String {
    "sample".to_string()
}

fn default_db_username() -> String {
    "postgres".to_string()
}

fn default_db_password() -> String {
    "password".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_query_timeout() -> u64 {
    60
}

fn default_pool_size() -> u32 {
    5
}

fn default_max_overflow() -> u32 {
    10
}

fn default_pool_recycle() -> u64 {
    3600 // 1 hour
}

fn default_pool_pre_ping() -> bool {
    true
}

fn default_pool_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // APP_SERVER__PORT, APP_DATABASE__HOST, APP_DATABASE__POOL_SIZE, ...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.pool_size == 0 {
            return Err(ConfigError::Message(
                "database.pool_size must be at least 1".to_string(),
            ));
        }
        if self.database.connect_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "database.connect_timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.database.query_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "database.query_timeout_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_seconds)
    }

    pub fn pool_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    /// `None` when recycling is disabled.
    pub fn pool_recycle(&self) -> Option<Duration> {
        (self.pool_recycle_seconds > 0).then(|| Duration::from_secs(self.pool_recycle_seconds))
    }

    /// `host:port/name`, safe to log and return to clients.
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.name)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            name: default_db_name(),
            username: default_db_username(),
            password: default_db_password(),
            connect_timeout_seconds: default_connect_timeout(),
            query_timeout_seconds: default_query_timeout(),
            pool_size: default_pool_size(),
            max_overflow: default_max_overflow(),
            pool_recycle_seconds: default_pool_recycle(),
            pool_pre_ping: default_pool_pre_ping(),
            pool_timeout_seconds: default_pool_timeout(),
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}
