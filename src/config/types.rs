//! Configuration types.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default port of the REST API.
pub const DEFAULT_PORT: u16 = 5022;

/// Shortest accepted HS256 signing key, in bytes.
pub const MIN_JWT_KEY_LEN: usize = 32;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub paging: PagingConfig,
}

impl Config {
    /// Load a single config file without tier merging.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.auth.validate()?;
        self.paging.validate()?;
        Ok(())
    }

    /// Create the parent directory of the database file if needed.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// HTTP server and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address to bind (default: 127.0.0.1).
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on (default: 5022).
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("task-manager/tasks.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Token issuance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for signing tokens. Must be at least 32 bytes.
    #[serde(default)]
    pub jwt_key: String,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    #[serde(default = "default_audience")]
    pub audience: String,

    /// Token lifetime in minutes (default: 120).
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_key: String::new(),
            issuer: default_issuer(),
            audience: default_audience(),
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.jwt_key.len() < MIN_JWT_KEY_LEN {
            return Err(anyhow!(
                "auth.jwt_key must be at least {} bytes (set TASK_MANAGER_JWT_KEY)",
                MIN_JWT_KEY_LEN
            ));
        }
        if self.token_ttl_minutes <= 0 {
            return Err(anyhow!("auth.token_ttl_minutes must be positive"));
        }
        Ok(())
    }
}

fn default_issuer() -> String {
    "task-manager-api".to_string()
}

fn default_audience() -> String {
    "task-manager-ui".to_string()
}

fn default_token_ttl_minutes() -> i64 {
    120
}

/// Page size bounds for filtered listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Page size used when the request omits one (default: 10).
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,

    /// Requests above this size are clamped down to it (default: 100).
    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl PagingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_page_size < 1 {
            return Err(anyhow!("paging.max_page_size must be at least 1"));
        }
        if self.default_page_size < 1 || self.default_page_size > self.max_page_size {
            return Err(anyhow!(
                "paging.default_page_size must be between 1 and {}",
                self.max_page_size
            ));
        }
        Ok(())
    }
}

fn default_page_size() -> i64 {
    10
}

fn default_max_page_size() -> i64 {
    100
}
