//! Configuration loader with tier-based merging.

use super::types::Config;
use anyhow::{Result, anyhow};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.yaml";

/// Directories searched for `config.yaml`, lowest priority first.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        let project_dir = std::env::var("TASK_MANAGER_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("task-manager")));

        let user_dir = std::env::var("TASK_MANAGER_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".task-manager")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Highest-priority config file that contributed, if any
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        if let Ok(explicit) = std::env::var("TASK_MANAGER_CONFIG_PATH") {
            return Self::load_explicit(PathBuf::from(explicit), paths);
        }

        let mut layers = vec![serde_json::to_value(Config::default())?];
        let mut config_path = None;

        for dir in [paths.project_dir.as_deref(), paths.user_dir.as_deref()]
            .into_iter()
            .flatten()
        {
            let file = dir.join(CONFIG_FILE);
            if let Some(layer) = read_yaml_layer(&file) {
                debug!("Loaded config layer from {}", file.display());
                layers.push(layer);
                config_path = Some(file);
            }
        }

        let merged = layers.into_iter().fold(Value::Null, deep_merge);
        let mut config: Config = serde_json::from_value(merged)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Load a single explicit file, skipping the directory tiers. Environment
    /// overrides still apply on top.
    pub fn load_explicit(path: PathBuf, paths: ConfigPaths) -> Result<Self> {
        let mut config = Config::load(&path)?;
        apply_env_overrides(&mut config)?;
        Ok(Self {
            paths,
            config,
            config_path: Some(path),
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Get the config file path that was used.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

/// Read a YAML file as a merge layer. Missing files are skipped silently;
/// unreadable or malformed ones are skipped with a warning.
fn read_yaml_layer(file: &Path) -> Option<Value> {
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            warn!("Skipping unreadable config {}: {}", file.display(), e);
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping malformed config {}: {}", file.display(), e);
            None
        }
    }
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(db_path) = std::env::var("TASK_MANAGER_DB_PATH") {
        config.server.db_path = PathBuf::from(db_path);
    }
    if let Ok(host) = std::env::var("TASK_MANAGER_HOST") {
        config.server.host = host;
    }
    if let Ok(port) = std::env::var("TASK_MANAGER_PORT") {
        config.server.port = port
            .parse()
            .map_err(|_| anyhow!("TASK_MANAGER_PORT is not a valid port: {}", port))?;
    }
    if let Ok(key) = std::env::var("TASK_MANAGER_JWT_KEY") {
        config.auth.jwt_key = key;
    }
    Ok(())
}

/// Merge `overlay` onto `base`.
///
/// Objects merge key by key; any other overlay value replaces the base
/// value, except null, which leaves the base untouched.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}
