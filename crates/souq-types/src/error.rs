//! Error types for the souq marketplace engine

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Unsupported DATABASE_URL: {0}")]
    UnsupportedDatabaseUrl(String),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Collection lock poisoned: {0}")]
    Poisoned(String),

    #[error("Collection file corrupted: {0}")]
    Corrupted(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient market data: {0}")]
    InsufficientMarketData(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Excel export error: {0}")]
    Export(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidInput`]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Shorthand for an [`Error::NotFound`]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
