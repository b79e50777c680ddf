//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     DEPOT_BACKEND=sqlite                                                │
//! │     DEPOT_DB_PATH=/var/lib/depot/depot.db                               │
//! │     DEPOT_PORT=8080                                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     --config <path> or DEPOT_CONFIG, else                               │
//! │     ~/.config/depot/depot.toml (Linux)                                  │
//! │     ~/Library/Application Support/com.depot.depot/depot.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     mock store with a snapshot in the platform data directory           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # depot.toml
//! [server]
//! port = 8080
//! bind_addr = "127.0.0.1"
//!
//! [store]
//! backend = "sqlite"            # memory | sqlite
//! db_path = "/var/lib/depot/depot.db"
//! snapshot_path = "/var/lib/depot/depot.json"
//! max_connections = 5
//! migrate_on_start = true
//! ```

use depot_store::{BackendConfig, DbConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Backend Kind
// =============================================================================

/// Which store the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-memory store mirrored to a JSON snapshot file.
    #[default]
    Memory,
    /// SQLite document store.
    Sqlite,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mock" => Ok(BackendKind::Memory),
            "sqlite" | "document" => Ok(BackendKind::Sqlite),
            other => Err(ConfigError::Invalid(format!(
                "Unknown backend: '{}'. Valid options: memory, sqlite",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Default: 127.0.0.1
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            port: default_port(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: BackendKind,

    /// Snapshot file of the mock store. `None` falls back to the platform
    /// data directory.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// SQLite file of the document store. Same fallback.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Run the document migration pass at startup.
    #[serde(default = "default_true")]
    pub migrate_on_start: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            backend: BackendKind::default(),
            snapshot_path: None,
            db_path: None,
            max_connections: default_max_connections(),
            migrate_on_start: true,
        }
    }
}

// =============================================================================
// Depot Config
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepotConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl DepotConfig {
    /// Loads defaults, then the config file, then environment overrides,
    /// and validates the result.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var_os("DEPOT_CONFIG").map(PathBuf::from))
            .or_else(Self::default_config_path);
        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("port must be greater than 0".into()));
        }
        if self.server.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_addr must not be empty".into()));
        }
        if self.store.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("DEPOT_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding backend from environment");
                    self.store.backend = parsed;
                }
                Err(e) => warn!(error = %e, "Ignoring DEPOT_BACKEND"),
            }
        }

        if let Ok(path) = std::env::var("DEPOT_SNAPSHOT_PATH") {
            self.store.snapshot_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("DEPOT_DB_PATH") {
            self.store.db_path = Some(PathBuf::from(path));
        }

        if let Ok(port) = std::env::var("DEPOT_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                debug!(port = p, "Overriding port from environment");
                self.server.port = p;
            }
        }

        if let Ok(addr) = std::env::var("DEPOT_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "depot", "depot")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("depot.toml"))
    }

    fn data_file(name: &str) -> PathBuf {
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join(name))
            .unwrap_or_else(|| PathBuf::from(name))
    }

    /// The backend the store should open.
    pub fn backend_config(&self) -> BackendConfig {
        match self.store.backend {
            BackendKind::Memory => BackendConfig::Memory {
                snapshot: Some(
                    self.store
                        .snapshot_path
                        .clone()
                        .unwrap_or_else(|| Self::data_file("depot.json")),
                ),
            },
            BackendKind::Sqlite => {
                let path = self
                    .store
                    .db_path
                    .clone()
                    .unwrap_or_else(|| Self::data_file("depot.db"));
                BackendConfig::Sqlite(
                    DbConfig::new(path).max_connections(self.store.max_connections),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("mock".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("SQLite".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert!("postgres".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_defaults_validate() {
        let config = DepotConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.store.backend, BackendKind::Memory);
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let mut config = DepotConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: DepotConfig = toml::from_str(
            r#"
            [store]
            backend = "sqlite"
            db_path = "/tmp/depot.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.store.migrate_on_start);
        match config.backend_config() {
            BackendConfig::Sqlite(db) => {
                assert_eq!(db.database_path, PathBuf::from("/tmp/depot.db"))
            }
            other => panic!("expected sqlite backend, got {other:?}"),
        }
    }
}
