//! Per-shard hash roots
//!
//! [`RootHasher`] keeps one incremental digest per shard index. Pieces must be
//! fed segment by segment in stream order; within a segment the accumulators
//! are independent and are updated in parallel for large pieces.

use crate::config::HashAlgorithm;
use crate::encoder::ShardPiece;
use crate::error::{GnfdError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Digest length of every supported algorithm
pub const HASH_ROOT_SIZE: usize = 32;

/// Pieces at least this large are hashed across shards in parallel
const PARALLEL_PIECE_THRESHOLD: usize = 64 * 1024;

/// Finalized digest of one shard's content across all segments
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashRoot([u8; HASH_ROOT_SIZE]);

impl HashRoot {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; HASH_ROOT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice (validates length)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; HASH_ROOT_SIZE] = slice.try_into().map_err(|_| {
            GnfdError::InvalidChecksums(format!(
                "hash root must be {} bytes, got {}",
                HASH_ROOT_SIZE,
                slice.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// One-shot digest of `data`
    pub fn compute(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        let mut acc = Accumulator::new(algorithm);
        acc.update(data);
        acc.finalize()
    }

    /// Digest of the empty byte sequence
    pub fn empty(algorithm: HashAlgorithm) -> Self {
        Self::compute(algorithm, &[])
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; HASH_ROOT_SIZE] {
        &self.0
    }

    /// Convert to lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex (an optional `0x` prefix is accepted)
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| GnfdError::InvalidChecksums(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for HashRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashRoot({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for HashRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for HashRoot {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for HashRoot {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HashRoot {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Incremental digest state for one shard
#[derive(Clone)]
pub enum Accumulator {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Accumulator {
    /// Fresh accumulator for `algorithm`
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Accumulator::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Accumulator::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    /// Feed more bytes
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Accumulator::Sha256(h) => h.update(data),
            Accumulator::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// Consume the accumulator and produce its root
    pub fn finalize(self) -> HashRoot {
        match self {
            Accumulator::Sha256(h) => HashRoot(h.finalize().into()),
            Accumulator::Blake3(h) => HashRoot(*h.finalize().as_bytes()),
        }
    }
}

/// One accumulator per shard index, fed in segment order
pub struct RootHasher {
    accumulators: Vec<Accumulator>,
    segments: u64,
}

impl RootHasher {
    /// Create `shard_count` empty accumulators
    pub fn new(algorithm: HashAlgorithm, shard_count: usize) -> Self {
        Self {
            accumulators: (0..shard_count).map(|_| Accumulator::new(algorithm)).collect(),
            segments: 0,
        }
    }

    /// Number of shards tracked
    pub fn shard_count(&self) -> usize {
        self.accumulators.len()
    }

    /// Number of segments absorbed so far
    pub fn segments(&self) -> u64 {
        self.segments
    }

    /// Absorb the pieces of the next segment. `pieces[i]` goes to shard `i`.
    pub fn feed_segment(&mut self, pieces: &[ShardPiece]) -> Result<()> {
        if pieces.len() != self.accumulators.len() {
            return Err(GnfdError::ShardSizeMismatch {
                expected: self.accumulators.len(),
                actual: pieces.len(),
            });
        }

        let large = pieces
            .first()
            .is_some_and(|p| p.size() >= PARALLEL_PIECE_THRESHOLD);

        if large {
            self.accumulators
                .par_iter_mut()
                .zip(pieces.par_iter())
                .for_each(|(acc, piece)| acc.update(&piece.data));
        } else {
            for (acc, piece) in self.accumulators.iter_mut().zip(pieces) {
                acc.update(&piece.data);
            }
        }

        self.segments += 1;
        Ok(())
    }

    /// Finalize every accumulator, ordered by shard index
    pub fn finalize(self) -> Vec<HashRoot> {
        self.accumulators.into_iter().map(Accumulator::finalize).collect()
    }
}
