//! Layered configuration.
//!
//! Configuration is assembled from tiers, each overriding the previous one
//! field by field:
//! 1. **Defaults** - compiled in (`Config::default()`)
//! 2. **Project** - `$CWD/task-manager/config.yaml`
//! 3. **User** - `~/.task-manager/config.yaml`
//! 4. **Environment** - the variables below
//!
//! CLI flags are applied on top by `main`.
//!
//! ## Environment Variables
//! - `TASK_MANAGER_CONFIG_PATH` - Explicit config file (replaces tiers 2 and 3)
//! - `TASK_MANAGER_DB_PATH` - Database path
//! - `TASK_MANAGER_HOST` - Bind address
//! - `TASK_MANAGER_PORT` - Listen port
//! - `TASK_MANAGER_JWT_KEY` - Token signing key
//! - `TASK_MANAGER_USER_DIR` - User config dir (default: `~/.task-manager`)
//! - `TASK_MANAGER_PROJECT_DIR` - Project config dir (default: `./task-manager`)

mod loader;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, deep_merge};
pub use types::*;
