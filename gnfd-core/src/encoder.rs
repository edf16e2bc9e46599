//! Redundancy encoding of segments into shard pieces
//!
//! Each segment becomes `data_shards + parity_shards` pieces of
//! `ceil(len / data_shards)` bytes:
//! - data pieces are contiguous slices of the zero-padded segment
//! - parity pieces are Reed-Solomon over GF(2^8), systematic Vandermonde
//!   generator matrix from `reed-solomon-erasure` (see [`ENCODING_VERSION`])
//!
//! With one data shard, or in replica mode, every piece is a verbatim copy of
//! the segment.

use crate::config::{RedundancyConfig, RedundancyType};
use crate::error::{GnfdError, Result};
use bytes::Bytes;
use reed_solomon_erasure::galois_8::ReedSolomon;
use serde::{Deserialize, Serialize};

/// Version of the generator matrix used for parity pieces. Parity bytes of a
/// given `(data_shards, parity_shards)` pair must never change under one
/// version.
pub const ENCODING_VERSION: u32 = 1;

/// One shard's piece of one segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardPiece {
    /// Shard index (0 to total_shards-1)
    pub index: u8,
    /// Piece bytes
    pub data: Bytes,
    /// Whether this piece belongs to a parity shard. Always false in replica
    /// mode, where every piece is a full replica.
    pub is_parity: bool,
}

impl ShardPiece {
    /// Create a new piece
    pub fn new(index: u8, data: Bytes, is_parity: bool) -> Self {
        Self {
            index,
            data,
            is_parity,
        }
    }

    /// Piece size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Segment encoder for one redundancy layout
pub struct RedundancyEncoder {
    data_shards: usize,
    parity_shards: usize,
    redundancy_type: RedundancyType,
    codec: Option<ReedSolomon>,
}

impl RedundancyEncoder {
    /// Create an encoder. Fails with `InvalidConfig` before any data is seen.
    pub fn new(config: &RedundancyConfig, redundancy_type: RedundancyType) -> Result<Self> {
        config.validate()?;

        let data_shards = config.data_shards as usize;
        let parity_shards = config.parity_shards as usize;

        let codec = match redundancy_type {
            RedundancyType::ErasureCoded if data_shards > 1 && parity_shards > 0 => {
                Some(ReedSolomon::new(data_shards, parity_shards)?)
            }
            _ => None,
        };

        Ok(Self {
            data_shards,
            parity_shards,
            redundancy_type,
            codec,
        })
    }

    /// Number of data shards
    pub fn data_shards(&self) -> usize {
        self.data_shards
    }

    /// Number of parity shards
    pub fn parity_shards(&self) -> usize {
        self.parity_shards
    }

    /// Total number of pieces produced per segment
    pub fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Whether pieces are verbatim copies of the segment
    pub fn is_replicating(&self) -> bool {
        self.redundancy_type == RedundancyType::Replica || self.data_shards == 1
    }

    /// Minimum number of pieces needed to rebuild a segment
    pub fn required_shards(&self) -> usize {
        if self.is_replicating() {
            1
        } else {
            self.data_shards
        }
    }

    /// Whether shard `index` holds parity rather than a data piece or replica
    pub fn is_parity_index(&self, index: usize) -> bool {
        self.redundancy_type != RedundancyType::Replica && index >= self.data_shards
    }

    /// Encode a segment into `total_shards()` pieces, ordered by shard index
    pub fn encode(&self, segment: &[u8]) -> Result<Vec<ShardPiece>> {
        if self.is_replicating() {
            let copy = Bytes::copy_from_slice(segment);
            return Ok((0..self.total_shards())
                .map(|i| ShardPiece::new(i as u8, copy.clone(), self.is_parity_index(i)))
                .collect());
        }

        let piece_len = segment.len().div_ceil(self.data_shards);

        // Pad with trailing zeros to exactly data_shards * piece_len
        let mut padded = Vec::with_capacity(piece_len * self.data_shards);
        padded.extend_from_slice(segment);
        padded.resize(piece_len * self.data_shards, 0);

        let mut shards: Vec<Vec<u8>> = if piece_len == 0 {
            vec![Vec::new(); self.data_shards]
        } else {
            padded.chunks(piece_len).map(|c| c.to_vec()).collect()
        };

        for _ in 0..self.parity_shards {
            shards.push(vec![0u8; piece_len]);
        }

        // Zero-length shards are rejected by the codec; their parity is empty too.
        if let Some(codec) = &self.codec {
            if piece_len > 0 {
                codec.encode(&mut shards)?;
            }
        }

        Ok(shards
            .into_iter()
            .enumerate()
            .map(|(i, piece)| ShardPiece::new(i as u8, Bytes::from(piece), self.is_parity_index(i)))
            .collect())
    }

    /// Rebuild a segment of `segment_len` bytes from its pieces.
    ///
    /// `pieces` must hold one slot per shard index; missing pieces are `None`.
    /// Any `required_shards()` present pieces are enough.
    pub fn reconstruct(&self, pieces: &[Option<ShardPiece>], segment_len: usize) -> Result<Bytes> {
        let total_shards = self.total_shards();
        if pieces.len() != total_shards {
            return Err(GnfdError::ShardSizeMismatch {
                expected: total_shards,
                actual: pieces.len(),
            });
        }

        let available = pieces.iter().filter(|p| p.is_some()).count();
        let required = self.required_shards();
        if available < required {
            return Err(GnfdError::InsufficientShards {
                available,
                required,
            });
        }

        if self.is_replicating() {
            let copy = pieces
                .iter()
                .flatten()
                .next()
                .ok_or(GnfdError::InsufficientShards {
                    available: 0,
                    required,
                })?;
            return Ok(copy.data.slice(..segment_len.min(copy.size())));
        }

        // Empty segments encode to empty pieces, which the codec rejects
        if segment_len == 0 || pieces.iter().flatten().all(|p| p.data.is_empty()) {
            return Ok(Bytes::new());
        }

        let mut shard_vecs: Vec<Option<Vec<u8>>> = pieces
            .iter()
            .map(|opt| opt.as_ref().map(|p| p.data.to_vec()))
            .collect();

        // Without a codec there is no parity, so every data piece is present.
        if let Some(codec) = &self.codec {
            codec.reconstruct_data(&mut shard_vecs)?;
        }

        let mut result = Vec::with_capacity(segment_len);
        for shard in shard_vecs.iter().take(self.data_shards) {
            match shard {
                Some(shard) => result.extend_from_slice(shard),
                None => {
                    return Err(GnfdError::ErasureCoding(
                        "reconstruction left a data shard missing".to_string(),
                    ))
                }
            }
        }

        result.truncate(segment_len);
        Ok(Bytes::from(result))
    }

    /// Check that a full set of pieces is mutually consistent
    pub fn verify(&self, pieces: &[ShardPiece]) -> Result<bool> {
        if pieces.len() != self.total_shards() {
            return Ok(false);
        }

        let expected_size = pieces.first().map(|p| p.size()).unwrap_or(0);
        if !pieces.iter().all(|p| p.size() == expected_size) {
            return Ok(false);
        }

        if self.is_replicating() {
            return Ok(pieces.windows(2).all(|w| w[0].data == w[1].data));
        }

        match &self.codec {
            Some(codec) if expected_size > 0 => {
                let refs: Vec<&[u8]> = pieces.iter().map(|p| p.data.as_ref()).collect();
                Ok(codec.verify(&refs)?)
            }
            _ => Ok(true),
        }
    }
}
