//! Chain redundancy parameters
//!
//! The segment size and shard counts are chain-wide storage parameters. The
//! query itself lives outside this crate; [`RedundancyParamsSource`] is the
//! seam it plugs into.

use crate::config::{ComputeHashOptions, HashAlgorithm, RedundancyConfig, RedundancyType};
use crate::error::{GnfdError, Result};
use crate::integrity::{IntegrityHasher, IntegrityResult};
use async_trait::async_trait;
use tokio::io::AsyncRead;
use tracing::{debug, warn};

/// Anything that can report the chain's current redundancy parameters
#[async_trait]
pub trait RedundancyParamsSource: Send + Sync {
    /// Fetch `(segment_size, data_shards, parity_shards)` from chain config
    async fn get_redundancy_params(&self) -> Result<RedundancyConfig>;
}

/// A fixed parameter set, e.g. loaded from a config file
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticParams {
    config: RedundancyConfig,
}

impl StaticParams {
    /// Wrap a known config
    pub fn new(config: RedundancyConfig) -> Self {
        Self { config }
    }

    /// Parameters from `GNFD_*` environment variables
    pub fn from_env() -> Self {
        Self::new(RedundancyConfig::from_env())
    }
}

#[async_trait]
impl RedundancyParamsSource for StaticParams {
    async fn get_redundancy_params(&self) -> Result<RedundancyConfig> {
        Ok(self.config)
    }
}

/// Query redundancy parameters once and hash `reader` with them.
///
/// Any failure of the query surfaces as `ConfigUnavailable`.
pub async fn compute_hash_roots<S, R>(
    source: &S,
    reader: Option<R>,
    redundancy_type: RedundancyType,
    hash_algorithm: HashAlgorithm,
) -> Result<IntegrityResult>
where
    S: RedundancyParamsSource + ?Sized,
    R: AsyncRead + Unpin,
{
    let reader = reader.ok_or(GnfdError::MissingInput)?;

    let redundancy = source.get_redundancy_params().await.map_err(|e| {
        warn!(error = %e, "Failed to query redundancy params");
        match e {
            GnfdError::ConfigUnavailable(_) => e,
            other => GnfdError::ConfigUnavailable(other.to_string()),
        }
    })?;

    debug!(
        segment_size = redundancy.segment_size,
        data_shards = redundancy.data_shards,
        parity_shards = redundancy.parity_shards,
        "Using chain redundancy params"
    );

    let options = ComputeHashOptions {
        redundancy,
        redundancy_type,
        hash_algorithm,
    };
    IntegrityHasher::new(options)
        .hash_async_reader(Some(reader))
        .await
}
