//! # Configuration
//!
//! Where the network's data lives and where the server listens.
//!
//! Sources, highest precedence first:
//! 1. Command-line flags
//! 2. TOML config file (`--config quack.toml`)
//! 3. Built-in defaults
//!
//! Security knobs of the HTTP API (`QUACK_API_KEY`, `QUACK_RATE_LIMIT`,
//! `QUACK_CORS_ORIGINS`) and `QUACK_LOG_FORMAT` come from the environment only.
//!
//! ## File Format
//!
//! ```toml
//! [storage]
//! backend = "redb"          # or "memory"
//! database = "quack.redb"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```

use clap::ValueEnum;
use quack_core::{Network, QuackError};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default database file.
pub const DEFAULT_DATABASE: &str = "quack.redb";
/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default bind port.
pub const DEFAULT_PORT: u16 = 8080;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Which storage backend a network uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Persistent redb database file.
    #[default]
    Redb,
    /// Volatile in-memory store; nothing survives the process.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Redb => f.write_str("redb"),
            BackendKind::Memory => f.write_str("memory"),
        }
    }
}

// =============================================================================
// CONFIG FILE
// =============================================================================

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    pub backend: Option<BackendKind>,
    pub database: Option<PathBuf>,
}

/// `[server]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Contents of a config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub storage: StorageSection,
    pub server: ServerSection,
}

impl FileConfig {
    /// Parse TOML text.
    pub fn parse(text: &str) -> Result<Self, QuackError> {
        toml::from_str(text)
            .map_err(|e| QuackError::ValidationFailed(format!("Invalid config file: {}", e)))
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, QuackError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            QuackError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(QuackError::ValidationFailed(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            QuackError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::parse(&text)
    }
}

// =============================================================================
// RESOLVED SETTINGS
// =============================================================================

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub backend: Option<BackendKind>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: PathBuf,
    pub backend: BackendKind,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(Overrides::default(), FileConfig::default())
    }
}

impl Settings {
    /// Merge flags over file values over defaults.
    #[must_use]
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Self {
        Self {
            database: overrides
                .database
                .or(file.storage.database)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            backend: overrides
                .backend
                .or(file.storage.backend)
                .unwrap_or_default(),
            host: overrides
                .host
                .or(file.server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
        }
    }

    /// Load the optional config file and merge it with `overrides`.
    pub fn load(config: Option<&Path>, overrides: Overrides) -> Result<Self, QuackError> {
        let file = match config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(overrides, file))
    }

    /// Bind address for the HTTP server.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open the network these settings describe.
    pub fn open_network(&self) -> Result<Network, QuackError> {
        match self.backend {
            BackendKind::Redb => Network::with_redb(&self.database),
            BackendKind::Memory => Ok(Network::new()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
