//! Error types for Pressbot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PressbotError>;

#[derive(Error, Debug)]
pub enum PressbotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl PressbotError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PressbotError::Platform(PlatformError::Authentication(_)) => 2,
            PressbotError::Platform(_) => 1,
            PressbotError::Config(_) => 1,
            PressbotError::Store(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize seen posts: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Request rejected: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("API error: {0}")]
    Api(String),
}
