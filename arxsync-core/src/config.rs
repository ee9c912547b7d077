//! YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.arxsync/
//!   config.yaml   (optional, every field has a default)
//!   store/        (default record store, see [`crate::store`])
//! ```
//!
//! # API pattern
//!
//! Every function takes an explicit `home` (`fn_at(home: &Path, …)`) so tests
//! can point it at a `TempDir`. Callers resolve the real one with [`home`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Query;

/// Audio and speech processing categories.
pub const DEFAULT_QUERY: &str = "cat:eess.AS+OR+cat:cs.SD";
pub const DEFAULT_ENDPOINT: &str = "https://export.arxiv.org/api/query";
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Effective settings for a sync run. Fields missing from the file take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record store directory. `None` means `<home>/.arxsync/store`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
    pub endpoint: String,
    pub query: String,
    pub page_size: usize,
    pub max_attempts: u32,
    pub timeout_secs: u64,
    pub retry_base_ms: u64,
    pub retry_jitter_ms: u64,
    pub success_pause_ms: u64,
    pub page_pause_base_ms: u64,
    pub page_pause_jitter_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            query: DEFAULT_QUERY.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_secs: 30,
            retry_base_ms: 2_000,
            retry_jitter_ms: 4_000,
            success_pause_ms: 500,
            page_pause_base_ms: 1_000,
            page_pause_jitter_ms: 3_000,
        }
    }
}

impl Config {
    pub fn query(&self) -> Query {
        Query::from(self.query.as_str())
    }

    /// Store directory, resolving the default against `home`.
    pub fn store_dir_at(&self, home: &Path) -> PathBuf {
        self.store_dir
            .clone()
            .unwrap_or_else(|| default_store_dir_at(home))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.arxsync/`
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".arxsync")
}

/// `<home>/.arxsync/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    root_at(home).join("config.yaml")
}

/// `<home>/.arxsync/store/`
pub fn default_store_dir_at(home: &Path) -> PathBuf {
    root_at(home).join("store")
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load `<home>/.arxsync/config.yaml`, or defaults if it does not exist.
///
/// Returns `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => return Err(ConfigError::Io { path, source }),
    };
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// Atomically save `config` to `<home>/.arxsync/config.yaml`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    let dir = root_at(home);
    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::Io {
        path: dir.clone(),
        source,
    })?;
    let path = config_path_at(home);
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|source| ConfigError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, &path).map_err(|source| ConfigError::Io { path, source })
}

/// The user's home directory, which holds `.arxsync/`.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}
