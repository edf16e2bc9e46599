//! Greenfield Client Core
//!
//! Client-side integrity hashing for objects stored on the Greenfield network.
//! This crate provides:
//! - Stream segmentation into fixed-size segments
//! - Reed-Solomon redundancy encoding (data + parity shards) and replication
//! - Per-shard hash roots (SHA-256 or Blake3) and total payload size
//! - The chain-parameter seam and the object-creation message payload

pub mod config;
pub mod encoder;
pub mod error;
pub mod hasher;
pub mod integrity;
pub mod object;
pub mod params;
pub mod segment;

pub use config::{ComputeHashOptions, HashAlgorithm, RedundancyConfig, RedundancyType};
pub use encoder::{RedundancyEncoder, ShardPiece, ENCODING_VERSION};
pub use error::{GnfdError, Result};
pub use hasher::{HashRoot, RootHasher};
pub use integrity::{
    compute_integrity_hash, compute_integrity_hash_async, IntegrityHasher, IntegrityResult,
};
pub use object::CreateObjectRequest;
pub use params::{compute_hash_roots, RedundancyParamsSource, StaticParams};
pub use segment::{AsyncSegmenter, Segmenter};

/// Default redundancy parameters of the network
/// - 16 MiB segments
/// - 4 data shards: minimum required to reconstruct
/// - 2 parity shards: can tolerate 2 provider failures
///
/// Override at runtime via GNFD_SEGMENT_SIZE / GNFD_DATA_SHARDS / GNFD_PARITY_SHARDS.
pub const DEFAULT_SEGMENT_SIZE: u64 = 16 * 1024 * 1024;
pub const DEFAULT_DATA_SHARDS: u32 = 4;
pub const DEFAULT_PARITY_SHARDS: u32 = 2;

/// Shard indices are a single byte
pub const MAX_TOTAL_SHARDS: usize = 256;
