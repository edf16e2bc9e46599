//! Redundancy and hashing configuration
//!
//! A [`RedundancyConfig`] is sourced from chain-wide storage parameters and is
//! immutable for the duration of one hashing operation. [`ComputeHashOptions`]
//! bundles it with the caller's redundancy intent and the digest algorithm so
//! the whole hashing setup is passed around explicitly.

use crate::error::{GnfdError, Result};
use crate::{DEFAULT_DATA_SHARDS, DEFAULT_PARITY_SHARDS, DEFAULT_SEGMENT_SIZE, MAX_TOTAL_SHARDS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Redundancy parameters (segment size, data shards, parity shards)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RedundancyConfig {
    /// Segment size in bytes (> 0)
    pub segment_size: u64,
    /// Number of data shards (>= 1)
    pub data_shards: u32,
    /// Number of parity shards
    pub parity_shards: u32,
}

impl Default for RedundancyConfig {
    fn default() -> Self {
        Self {
            segment_size: DEFAULT_SEGMENT_SIZE,
            data_shards: DEFAULT_DATA_SHARDS,
            parity_shards: DEFAULT_PARITY_SHARDS,
        }
    }
}

impl RedundancyConfig {
    /// Create a validated redundancy config
    pub fn new(segment_size: u64, data_shards: u32, parity_shards: u32) -> Result<Self> {
        let config = Self {
            segment_size,
            data_shards,
            parity_shards,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read redundancy parameters from the environment, falling back to the
    /// network defaults for anything unset or unparsable.
    ///
    /// Variables: `GNFD_SEGMENT_SIZE`, `GNFD_DATA_SHARDS`, `GNFD_PARITY_SHARDS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            segment_size: env_or("GNFD_SEGMENT_SIZE", defaults.segment_size),
            data_shards: env_or("GNFD_DATA_SHARDS", defaults.data_shards),
            parity_shards: env_or("GNFD_PARITY_SHARDS", defaults.parity_shards),
        }
    }

    /// Check the invariants the encoder relies on
    pub fn validate(&self) -> Result<()> {
        if self.data_shards == 0 {
            return Err(GnfdError::InvalidConfig(
                "data_shards must be > 0".to_string(),
            ));
        }
        if self.segment_size == 0 {
            return Err(GnfdError::InvalidConfig(
                "segment_size must be > 0".to_string(),
            ));
        }
        if usize::try_from(self.segment_size).is_err() {
            return Err(GnfdError::InvalidConfig(format!(
                "segment_size {} does not fit in memory on this platform",
                self.segment_size
            )));
        }
        if self.total_shards() > MAX_TOTAL_SHARDS {
            return Err(GnfdError::InvalidConfig(format!(
                "data_shards + parity_shards must be <= {}, got {}",
                MAX_TOTAL_SHARDS,
                self.total_shards()
            )));
        }
        Ok(())
    }

    /// Total number of shards (and hash roots)
    pub fn total_shards(&self) -> usize {
        self.data_shards as usize + self.parity_shards as usize
    }

    /// Segment size as a buffer length. Only meaningful after `validate`.
    pub fn segment_len(&self) -> usize {
        usize::try_from(self.segment_size).unwrap_or(usize::MAX)
    }

    /// Length of every shard piece for a segment of `segment_len` bytes
    pub fn piece_len(&self, segment_len: usize) -> usize {
        segment_len.div_ceil(self.data_shards.max(1) as usize)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// How an object's payload is made redundant across storage providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedundancyType {
    /// Reed-Solomon erasure coding across data + parity shards
    #[default]
    ErasureCoded,
    /// Every shard is a verbatim copy of the segment
    Replica,
}

impl fmt::Display for RedundancyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedundancyType::ErasureCoded => write!(f, "REDUNDANCY_EC_TYPE"),
            RedundancyType::Replica => write!(f, "REDUNDANCY_REPLICA_TYPE"),
        }
    }
}

/// Digest used for shard hash roots. Changing it breaks verifiability of
/// every object hashed with the previous algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, what storage providers verify against
    #[default]
    Sha256,
    /// Blake3
    Blake3,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = GnfdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(GnfdError::InvalidConfig(format!(
                "unknown hash algorithm: {other}"
            ))),
        }
    }
}

/// Everything the integrity hasher needs to know about one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComputeHashOptions {
    /// Chain redundancy parameters
    pub redundancy: RedundancyConfig,
    /// Erasure-coded or replicated
    #[serde(default)]
    pub redundancy_type: RedundancyType,
    /// Digest algorithm for the hash roots
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl ComputeHashOptions {
    /// Erasure-coded SHA-256 options for the given parameters
    pub fn new(redundancy: RedundancyConfig) -> Self {
        Self {
            redundancy,
            redundancy_type: RedundancyType::default(),
            hash_algorithm: HashAlgorithm::default(),
        }
    }

    /// Set the redundancy type
    pub fn with_redundancy_type(mut self, redundancy_type: RedundancyType) -> Self {
        self.redundancy_type = redundancy_type;
        self
    }

    /// Set the hash algorithm
    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RedundancyConfig::default();
        assert_eq!(config.segment_size, 16 * 1024 * 1024);
        assert_eq!(config.data_shards, 4);
        assert_eq!(config.parity_shards, 2);
        assert_eq!(config.total_shards(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_data_shards_rejected() {
        let result = RedundancyConfig::new(1024, 0, 2);
        assert!(matches!(result, Err(GnfdError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_segment_size_rejected() {
        let result = RedundancyConfig::new(0, 4, 2);
        assert!(matches!(result, Err(GnfdError::InvalidConfig(_))));
    }

    #[test]
    fn test_shard_ceiling() {
        assert!(RedundancyConfig::new(1024, 200, 56).is_ok());
        let result = RedundancyConfig::new(1024, 200, 57);
        assert!(matches!(result, Err(GnfdError::InvalidConfig(_))));
    }

    #[test]
    fn test_data_shards_may_exceed_segment_size() {
        let config = RedundancyConfig::new(2, 8, 0).unwrap();
        assert_eq!(config.piece_len(2), 1);
    }

    #[test]
    fn test_piece_len() {
        let config = RedundancyConfig::new(1024, 4, 2).unwrap();
        assert_eq!(config.piece_len(1024), 256);
        assert_eq!(config.piece_len(10), 3);
        assert_eq!(config.piece_len(0), 0);
    }

    #[test]
    fn test_hash_algorithm_parse() {
        assert_eq!("SHA256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("blake3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_options_serde() {
        let options = ComputeHashOptions::new(RedundancyConfig::default())
            .with_redundancy_type(RedundancyType::Replica);
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"replica\""));
        assert!(json.contains("\"sha256\""));
        let parsed: ComputeHashOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, options);
    }
}
