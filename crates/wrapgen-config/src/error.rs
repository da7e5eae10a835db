//! Error types for wrapgen-config.

use thiserror::Error;

/// Result type for wrapgen-config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading override configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read an override or caster file.
    #[error("Failed to read config file: {0}")]
    ReadConfig(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A buffer spec names the same parameter as source and length.
    #[error("{symbol}: buffer src({src}) and len({len}) cannot be the same")]
    BufferAlias {
        symbol: String,
        src: String,
        len: String,
    },
}
