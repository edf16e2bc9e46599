//! Integrity hash computation
//!
//! Runs the segment → encode → hash pipeline over a content stream and
//! produces one hash root per shard plus the total payload size. The output
//! goes verbatim into the object-creation record, and every storage provider
//! recomputes the root for the shard it stores, so the result must be
//! bit-exact for a given input and [`ComputeHashOptions`].

use crate::config::ComputeHashOptions;
use crate::encoder::RedundancyEncoder;
use crate::error::{GnfdError, Result};
use crate::hasher::{HashRoot, RootHasher};
use crate::segment::{AsyncSegmenter, Segmenter};
use serde::{Deserialize, Serialize};
use std::io::Read;
use tokio::io::AsyncRead;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Hash roots and payload size of one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityResult {
    /// One root per shard, ordered by shard index
    pub hash_roots: Vec<HashRoot>,
    /// Exact byte length of the stream
    pub total_size: i64,
}

impl IntegrityResult {
    /// Hash roots as raw byte vectors, the form embedded on chain
    pub fn checksums(&self) -> Vec<Vec<u8>> {
        self.hash_roots.iter().map(|r| r.as_bytes().to_vec()).collect()
    }

    /// Root of shard `index`, if it exists
    pub fn root(&self, index: usize) -> Option<&HashRoot> {
        self.hash_roots.get(index)
    }
}

/// Reusable integrity hasher for one set of options
#[derive(Debug, Clone)]
pub struct IntegrityHasher {
    options: ComputeHashOptions,
    cancel: CancellationToken,
}

impl IntegrityHasher {
    /// Create a hasher for the given options
    pub fn new(options: ComputeHashOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort hashing at the next segment boundary once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Get the hashing options
    pub fn options(&self) -> &ComputeHashOptions {
        &self.options
    }

    /// Hash a blocking stream
    #[instrument(skip(self, reader), fields(
        segment_size = self.options.redundancy.segment_size,
        data_shards = self.options.redundancy.data_shards,
        parity_shards = self.options.redundancy.parity_shards,
    ))]
    pub fn hash_reader<R: Read>(&self, reader: Option<R>) -> Result<IntegrityResult> {
        let reader = reader.ok_or(GnfdError::MissingInput)?;
        let (encoder, mut hasher) = self.prepare()?;
        let mut segments = Segmenter::new(reader, self.options.redundancy.segment_len());

        loop {
            if self.cancel.is_cancelled() {
                debug!(bytes_read = segments.bytes_read(), "Integrity hashing cancelled");
                return Err(GnfdError::Cancelled);
            }
            let Some(segment) = segments.next() else {
                break;
            };
            let pieces = encoder.encode(&segment?)?;
            hasher.feed_segment(&pieces)?;
        }

        finish(hasher, segments.bytes_read())
    }

    /// Hash an async stream.
    ///
    /// Encoding and hashing of each segment run in place on the calling
    /// task. On a multi-threaded runtime the worker is handed off first
    /// (`block_in_place`) so other tasks keep running. A pending read is
    /// abandoned as soon as the cancellation token fires.
    #[instrument(skip(self, reader), fields(
        segment_size = self.options.redundancy.segment_size,
        data_shards = self.options.redundancy.data_shards,
        parity_shards = self.options.redundancy.parity_shards,
    ))]
    pub async fn hash_async_reader<R>(&self, reader: Option<R>) -> Result<IntegrityResult>
    where
        R: AsyncRead + Unpin,
    {
        let reader = reader.ok_or(GnfdError::MissingInput)?;
        let (encoder, mut hasher) = self.prepare()?;
        let mut segments = AsyncSegmenter::new(reader, self.options.redundancy.segment_len());

        loop {
            if self.cancel.is_cancelled() {
                debug!(bytes_read = segments.bytes_read(), "Integrity hashing cancelled");
                return Err(GnfdError::Cancelled);
            }
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(GnfdError::Cancelled),
                next = segments.next_segment() => next?,
            };
            let Some(segment) = next else {
                break;
            };
            run_blocking(|| {
                let pieces = encoder.encode(&segment)?;
                hasher.feed_segment(&pieces)
            })?;
        }

        finish(hasher, segments.bytes_read())
    }

    fn prepare(&self) -> Result<(RedundancyEncoder, RootHasher)> {
        let encoder =
            RedundancyEncoder::new(&self.options.redundancy, self.options.redundancy_type)?;
        let hasher = RootHasher::new(self.options.hash_algorithm, encoder.total_shards());
        Ok((encoder, hasher))
    }
}

/// Run CPU-bound work without stalling a multi-threaded runtime's worker.
/// `block_in_place` panics on a current-thread runtime, so there it runs inline.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn finish(hasher: RootHasher, bytes_read: u64) -> Result<IntegrityResult> {
    let segments = hasher.segments();
    let total_size = i64::try_from(bytes_read).map_err(|_| {
        GnfdError::ReadError(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "stream length exceeds i64::MAX",
        ))
    })?;
    let hash_roots = hasher.finalize();

    debug!(
        segments,
        total_size,
        roots = hash_roots.len(),
        "Computed integrity hash"
    );

    Ok(IntegrityResult {
        hash_roots,
        total_size,
    })
}

/// Compute the integrity hash of a blocking stream
pub fn compute_integrity_hash<R: Read>(
    reader: Option<R>,
    options: &ComputeHashOptions,
) -> Result<IntegrityResult> {
    IntegrityHasher::new(*options).hash_reader(reader)
}

/// Compute the integrity hash of an async stream
pub async fn compute_integrity_hash_async<R>(
    reader: Option<R>,
    options: &ComputeHashOptions,
) -> Result<IntegrityResult>
where
    R: AsyncRead + Unpin,
{
    IntegrityHasher::new(*options).hash_async_reader(reader).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HashAlgorithm, RedundancyConfig, RedundancyType};
    use crate::encoder::ShardPiece;
    use crate::segment::tests::FailingReader;
    use proptest::prelude::*;
    use std::io::{self, Cursor};

    fn options(segment_size: u64, data: u32, parity: u32) -> ComputeHashOptions {
        ComputeHashOptions::new(RedundancyConfig::new(segment_size, data, parity).unwrap())
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    /// Reader that panics if touched
    struct UntouchableReader;

    impl Read for UntouchableReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            panic!("reader must not be consumed");
        }
    }

    #[test]
    fn test_small_input_single_segment() {
        let result =
            compute_integrity_hash(Some(Cursor::new(pattern(10))), &options(1024, 4, 2)).unwrap();
        assert_eq!(result.hash_roots.len(), 6);
        assert_eq!(result.total_size, 10);
    }

    #[test]
    fn test_two_segments_no_parity_reproducible() {
        let data = pattern(2048);
        let opts = options(1024, 4, 0);

        let first = compute_integrity_hash(Some(Cursor::new(data.clone())), &opts).unwrap();
        let second = compute_integrity_hash(Some(Cursor::new(data)), &opts).unwrap();

        assert_eq!(first.hash_roots.len(), 4);
        assert_eq!(first.total_size, 2048);
        assert_eq!(first, second);
    }

    #[test]
    fn test_roots_match_concatenated_pieces() {
        let data = pattern(2500);
        let opts = options(1000, 3, 2);
        let result = compute_integrity_hash(Some(Cursor::new(data.clone())), &opts).unwrap();

        let encoder = RedundancyEncoder::new(&opts.redundancy, opts.redundancy_type).unwrap();
        let mut per_shard = vec![Vec::new(); 5];
        for segment in data.chunks(1000) {
            for piece in encoder.encode(segment).unwrap() {
                per_shard[piece.index as usize].extend_from_slice(&piece.data);
            }
        }

        for (root, shard) in result.hash_roots.iter().zip(&per_shard) {
            assert_eq!(*root, HashRoot::compute(HashAlgorithm::Sha256, shard));
        }
    }

    #[test]
    fn test_empty_input() {
        let result =
            compute_integrity_hash(Some(Cursor::new(Vec::new())), &options(1024, 4, 2)).unwrap();
        assert_eq!(result.total_size, 0);
        assert_eq!(result.hash_roots.len(), 6);
        let empty = HashRoot::empty(HashAlgorithm::Sha256);
        assert!(result.hash_roots.iter().all(|r| *r == empty));
    }

    #[test]
    fn test_missing_input() {
        let result = compute_integrity_hash(None::<Cursor<Vec<u8>>>, &options(1024, 4, 2));
        assert!(matches!(result, Err(GnfdError::MissingInput)));
    }

    #[test]
    fn test_invalid_config_rejected_before_reading() {
        let opts = ComputeHashOptions::new(RedundancyConfig {
            segment_size: 1024,
            data_shards: 0,
            parity_shards: 2,
        });
        let result = compute_integrity_hash(Some(UntouchableReader), &opts);
        assert!(matches!(result, Err(GnfdError::InvalidConfig(_))));
    }

    #[test]
    fn test_replication_roots_identical() {
        let result =
            compute_integrity_hash(Some(Cursor::new(pattern(5000))), &options(1024, 1, 3)).unwrap();
        assert_eq!(result.hash_roots.len(), 4);
        assert!(result.hash_roots.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(
            result.hash_roots[0],
            HashRoot::compute(HashAlgorithm::Sha256, &pattern(5000))
        );
    }

    #[test]
    fn test_replica_type_roots_identical() {
        let opts = options(1024, 4, 2).with_redundancy_type(RedundancyType::Replica);
        let result = compute_integrity_hash(Some(Cursor::new(pattern(3000))), &opts).unwrap();
        assert_eq!(result.hash_roots.len(), 6);
        assert!(result.hash_roots.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_algorithms_differ() {
        let data = pattern(4096);
        let sha = compute_integrity_hash(Some(Cursor::new(data.clone())), &options(1024, 4, 2))
            .unwrap();
        let blake = compute_integrity_hash(
            Some(Cursor::new(data)),
            &options(1024, 4, 2).with_hash_algorithm(HashAlgorithm::Blake3),
        )
        .unwrap();
        assert_eq!(sha.total_size, blake.total_size);
        assert_ne!(sha.hash_roots, blake.hash_roots);
    }

    #[test]
    fn test_read_failure_returns_no_result() {
        let reader = FailingReader {
            good: pattern(3000),
            pos: 0,
        };
        let result = compute_integrity_hash(Some(reader), &options(1024, 4, 2));
        assert!(matches!(result, Err(GnfdError::ReadError(_))));
    }

    #[tokio::test]
    async fn test_async_read_failure_returns_no_result() {
        let reader = FailingReader {
            good: pattern(3000),
            pos: 0,
        };
        let result = compute_integrity_hash_async(Some(reader), &options(1024, 4, 2)).await;
        assert!(matches!(result, Err(GnfdError::ReadError(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_on_multi_thread_runtime_matches_sync() {
        let data = pattern(200_000);
        let opts = options(64 * 1024, 4, 2);

        let sync = compute_integrity_hash(Some(Cursor::new(&data)), &opts).unwrap();
        let handle = tokio::spawn(async move {
            compute_integrity_hash_async(Some(data.as_slice()), &opts).await
        });
        assert_eq!(handle.await.unwrap().unwrap(), sync);
    }

    #[test]
    fn test_cancelled_before_first_read() {
        let token = CancellationToken::new();
        token.cancel();
        let hasher = IntegrityHasher::new(options(1024, 4, 2)).with_cancellation(token);
        let result = hasher.hash_reader(Some(UntouchableReader));
        assert!(matches!(result, Err(GnfdError::Cancelled)));
    }

    #[test]
    fn test_checksums_are_raw_roots() {
        let result =
            compute_integrity_hash(Some(Cursor::new(pattern(10))), &options(1024, 4, 2)).unwrap();
        let checksums = result.checksums();
        assert_eq!(checksums.len(), 6);
        assert_eq!(checksums[2].as_slice(), result.root(2).unwrap().as_bytes());
        assert!(result.root(6).is_none());
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let data = pattern(10_000);
        let opts = options(1024, 4, 2);
        let sync = compute_integrity_hash(Some(Cursor::new(data.clone())), &opts).unwrap();
        let async_result = compute_integrity_hash_async(Some(data.as_slice()), &opts)
            .await
            .unwrap();
        assert_eq!(sync, async_result);
    }

    #[tokio::test]
    async fn test_async_missing_input() {
        let result = compute_integrity_hash_async(None::<&[u8]>, &options(1024, 4, 2)).await;
        assert!(matches!(result, Err(GnfdError::MissingInput)));
    }

    #[tokio::test]
    async fn test_async_cancel_pending_read() {
        let (client, _server) = tokio::io::duplex(64);
        let token = CancellationToken::new();
        let hasher = IntegrityHasher::new(options(1024, 4, 2)).with_cancellation(token.clone());

        let handle = tokio::spawn(async move { hasher.hash_async_reader(Some(client)).await });
        tokio::task::yield_now().await;
        token.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(GnfdError::Cancelled)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_deterministic_and_sized(
            data in proptest::collection::vec(any::<u8>(), 0..4096),
            segment_size in 1u64..600,
            data_shards in 1u32..7,
            parity_shards in 0u32..4,
        ) {
            let opts = options(segment_size, data_shards, parity_shards);
            let a = compute_integrity_hash(Some(Cursor::new(data.clone())), &opts).unwrap();
            let b = compute_integrity_hash(Some(Cursor::new(data.clone())), &opts).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.total_size, data.len() as i64);
            prop_assert_eq!(a.hash_roots.len(), (data_shards + parity_shards) as usize);
        }

        #[test]
        fn prop_any_data_shards_reconstruct(
            segment in proptest::collection::vec(any::<u8>(), 1..2048),
            data_shards in 2u32..8,
            parity_shards in 1u32..5,
            seed in any::<u64>(),
        ) {
            let config = RedundancyConfig::new(4096, data_shards, parity_shards).unwrap();
            let encoder = RedundancyEncoder::new(&config, RedundancyType::ErasureCoded).unwrap();
            let pieces = encoder.encode(&segment).unwrap();

            // Drop `parity_shards` pieces chosen by the seed
            let total = pieces.len();
            let mut slots: Vec<Option<ShardPiece>> = pieces.into_iter().map(Some).collect();
            let mut state = seed;
            let mut dropped = 0;
            while dropped < parity_shards as usize {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let idx = (state >> 33) as usize % total;
                if slots[idx].take().is_some() {
                    dropped += 1;
                }
            }

            let rebuilt = encoder.reconstruct(&slots, segment.len()).unwrap();
            prop_assert_eq!(rebuilt.as_ref(), segment.as_slice());
        }
    }
}
