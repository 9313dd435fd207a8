mod settings;

pub use settings::{DatabaseConfig, LogFormat, LoggingConfig, ServerConfig, Settings};
