//! Configuration management
//!
//! Config directory: ~/.gnfd/ (cross-platform)
//!
//! Config file format (~/.gnfd/config.toml):
//! ```toml
//! [redundancy]
//! segment_size = 16777216
//! data_shards = 4
//! parity_shards = 2
//!
//! [hash]
//! algorithm = "sha256"
//! redundancy_type = "erasure_coded"
//! ```
//!
//! Priority: CLI flags > GNFD_* env vars > config file > network defaults

use anyhow::{Context, Result};
use gnfd_core::{ComputeHashOptions, HashAlgorithm, RedundancyConfig, RedundancyType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Structure of ~/.gnfd/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GnfdConfig {
    /// Chain redundancy parameters used when no chain is reachable
    #[serde(default)]
    pub redundancy: RedundancyConfig,

    /// Hashing settings
    #[serde(default)]
    pub hash: HashSettings,
}

/// Hashing settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HashSettings {
    /// Digest for hash roots
    #[serde(default)]
    pub algorithm: HashAlgorithm,

    /// Erasure coded or replicated
    #[serde(default)]
    pub redundancy_type: RedundancyType,
}

/// Command-line overrides, applied last
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub segment_size: Option<u64>,
    pub data_shards: Option<u32>,
    pub parity_shards: Option<u32>,
    pub algorithm: Option<HashAlgorithm>,
    pub replica: bool,
}

impl GnfdConfig {
    /// Apply GNFD_* environment variables that are set and parse
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_var("GNFD_SEGMENT_SIZE") {
            self.redundancy.segment_size = v;
        }
        if let Some(v) = env_var("GNFD_DATA_SHARDS") {
            self.redundancy.data_shards = v;
        }
        if let Some(v) = env_var("GNFD_PARITY_SHARDS") {
            self.redundancy.parity_shards = v;
        }
        if let Some(v) = env_var("GNFD_HASH_ALGORITHM") {
            self.hash.algorithm = v;
        }
        self
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(v) = overrides.segment_size {
            self.redundancy.segment_size = v;
        }
        if let Some(v) = overrides.data_shards {
            self.redundancy.data_shards = v;
        }
        if let Some(v) = overrides.parity_shards {
            self.redundancy.parity_shards = v;
        }
        if let Some(v) = overrides.algorithm {
            self.hash.algorithm = v;
        }
        if overrides.replica {
            self.hash.redundancy_type = RedundancyType::Replica;
        }
        self
    }

    /// Validated hashing options
    pub fn hash_options(&self) -> Result<ComputeHashOptions> {
        self.redundancy
            .validate()
            .context("Invalid redundancy configuration")?;
        Ok(ComputeHashOptions::new(self.redundancy)
            .with_redundancy_type(self.hash.redundancy_type)
            .with_hash_algorithm(self.hash.algorithm))
    }
}

fn env_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    match std::env::var(key) {
        Ok(v) => match v.trim().parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                tracing::warn!(key, value = %v, "Ignoring unparsable environment variable");
                None
            }
        },
        Err(_) => None,
    }
}

/// Get the config directory path (~/.gnfd/)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".gnfd"))
}

/// Get the default config file path
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration.
///
/// An explicit path must exist and parse. The default path falls back to
/// defaults when missing or unreadable.
pub fn load_config(explicit: Option<&Path>) -> Result<GnfdConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    match config_file_path() {
        Ok(path) if path.exists() => match read_config(&path) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load config, using defaults");
                Ok(GnfdConfig::default())
            }
        },
        _ => Ok(GnfdConfig::default()),
    }
}

fn read_config(path: &Path) -> Result<GnfdConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Save configuration to `path`, creating parent directories
pub fn save_config(config: &GnfdConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, content).context("Failed to write config file")?;
    Ok(())
}
