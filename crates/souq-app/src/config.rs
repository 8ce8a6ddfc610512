//! Configuration management for souq
//!
//! Config stored at: ~/.config/souq/config.toml
//!
//! Values are merged as: CLI flags > environment > config file > defaults.
//! Flags are applied by the caller after [`Config::load`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use souq_domain::model::MatchOptions;
use souq_types::{ConfigError, OutputFormat, Result};

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_JWT_SECRET: &str = "JWT_SECRET";
pub const ENV_JWT_REFRESH_SECRET: &str = "JWT_REFRESH_SECRET";
pub const ENV_API_URL: &str = "API_URL";
pub const ENV_ENVIRONMENT: &str = "SOUQ_ENV";
pub const ENV_BIND: &str = "SOUQ_BIND";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Environment name reported by the health endpoint
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Listen address for `serve`
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Store directory override (used when no database url is set)
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    /// `memory://` or `file:///path`
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default)]
    pub jwt_refresh_secret: Option<String>,

    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,

    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,

    /// Base URL targeted by the smoke test
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Default output format (json, table)
    #[serde(default)]
    pub output_format: OutputFormat,

    #[serde(default = "default_barter_tolerance")]
    pub barter_tolerance: f64,

    #[serde(default = "default_barter_max_chain_length")]
    pub barter_max_chain_length: usize,

    #[serde(default = "default_barter_limit")]
    pub barter_limit: usize,

    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,

    /// Reference price TOML; the built-in table is used when unset
    #[serde(default)]
    pub market_data_path: Option<PathBuf>,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

fn default_access_ttl() -> i64 {
    DEFAULT_ACCESS_TOKEN_TTL_SECS
}

fn default_refresh_ttl() -> i64 {
    DEFAULT_REFRESH_TOKEN_TTL_SECS
}

fn default_api_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_barter_tolerance() -> f64 {
    MatchOptions::default().tolerance
}

fn default_barter_max_chain_length() -> usize {
    MatchOptions::default().max_chain_length
}

fn default_barter_limit() -> usize {
    MatchOptions::default().limit
}

fn default_recommendation_limit() -> usize {
    souq_domain::service::recommender::DEFAULT_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            bind: default_bind(),
            store_dir: None,
            database_url: None,
            jwt_secret: None,
            jwt_refresh_secret: None,
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
            api_url: default_api_url(),
            output_format: OutputFormat::Table,
            barter_tolerance: default_barter_tolerance(),
            barter_max_chain_length: default_barter_max_chain_length(),
            barter_limit: default_barter_limit(),
            recommendation_limit: default_recommendation_limit(),
            market_data_path: None,
        }
    }
}

/// Where records are kept, resolved from the database url or store dir
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    Dir(PathBuf),
}

/// Parse a `DATABASE_URL`. Only `memory://` and `file://` are supported.
pub fn parse_database_url(url: &str) -> Result<StoreLocation> {
    let url = url.trim();
    if url == "memory://" || url == "memory" {
        return Ok(StoreLocation::Memory);
    }
    if let Some(path) = url.strip_prefix("file://") {
        if path.is_empty() {
            return Err(ConfigError::UnsupportedDatabaseUrl(url.to_string()).into());
        }
        return Ok(StoreLocation::Dir(PathBuf::from(path)));
    }
    Err(ConfigError::UnsupportedDatabaseUrl(url.to_string()).into())
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("souq");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the store directory path
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.store_dir {
            return Ok(dir.clone());
        }

        let data_dir = dirs::data_dir()
            .ok_or(ConfigError::NotFound)?
            .join("souq")
            .join("store");
        Ok(data_dir)
    }

    pub fn store_location(&self) -> Result<StoreLocation> {
        match &self.database_url {
            Some(url) => parse_database_url(url),
            None => Ok(StoreLocation::Dir(self.store_dir()?)),
        }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            tolerance: self.barter_tolerance,
            max_chain_length: self.barter_max_chain_length,
            limit: self.barter_limit,
        }
    }

    pub fn jwt_secret(&self) -> Result<&str> {
        self.jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::Missing(ENV_JWT_SECRET).into())
    }

    pub fn jwt_refresh_secret(&self) -> Result<&str> {
        self.jwt_refresh_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::Missing(ENV_JWT_REFRESH_SECRET).into())
    }

    /// Load config file (or defaults), then apply the process environment
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from file, or create default
    pub fn load_file() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)).into())
    }

    /// Overlay environment variables. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_DATABASE_URL) {
            self.database_url = Some(v);
        }
        if let Some(v) = get(ENV_JWT_SECRET) {
            self.jwt_secret = Some(v);
        }
        if let Some(v) = get(ENV_JWT_REFRESH_SECRET) {
            self.jwt_refresh_secret = Some(v);
        }
        if let Some(v) = get(ENV_API_URL) {
            self.api_url = v;
        }
        if let Some(v) = get(ENV_ENVIRONMENT) {
            self.environment = v;
        }
        if let Some(v) = get(ENV_BIND) {
            self.bind = v;
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn mask(secret: &Option<String>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => "********",
        _ => "(not set)",
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Souq Configuration")?;
        writeln!(f, "==================")?;
        writeln!(f)?;
        writeln!(f, "Environment:          {}", self.environment)?;
        writeln!(f, "Bind address:         {}", self.bind)?;
        writeln!(
            f,
            "Database URL:         {}",
            self.database_url.as_deref().unwrap_or("(not set)")
        )?;
        writeln!(
            f,
            "Store dir:            {}",
            self.store_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(error)".to_string())
        )?;
        writeln!(f, "JWT secret:           {}", mask(&self.jwt_secret))?;
        writeln!(f, "JWT refresh secret:   {}", mask(&self.jwt_refresh_secret))?;
        writeln!(f, "Access token TTL:     {}s", self.access_token_ttl_secs)?;
        writeln!(f, "Refresh token TTL:    {}s", self.refresh_token_ttl_secs)?;
        writeln!(f, "API URL:              {}", self.api_url)?;
        writeln!(f, "Output format:        {}", self.output_format)?;
        writeln!(f, "Barter tolerance:     {}", self.barter_tolerance)?;
        writeln!(f, "Barter max length:    {}", self.barter_max_chain_length)?;
        writeln!(f, "Barter limit:         {}", self.barter_limit)?;
        writeln!(f, "Recommendation limit: {}", self.recommendation_limit)?;
        writeln!(
            f,
            "Market data:          {}",
            self.market_data_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in)".to_string())
        )?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:          {}", path.display())?;
        }

        Ok(())
    }
}
