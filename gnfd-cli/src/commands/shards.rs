//! Shards Command
//!
//! Writes the content each storage provider would hold: one file per shard
//! index with that shard's pieces concatenated in segment order. The printed
//! roots are the digests of exactly those files.

use anyhow::{Context, Result};
use console::style;
use gnfd_core::{
    ComputeHashOptions, IntegrityResult, RedundancyEncoder, RootHasher, Segmenter,
};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::symbols;

/// Shards configuration
pub struct ShardsConfig {
    pub path: PathBuf,
    pub out_dir: PathBuf,
}

/// Run shards command
pub async fn run(options: ComputeHashOptions, config: ShardsConfig) -> Result<()> {
    let out_dir = config.out_dir.clone();
    let result = tokio::task::spawn_blocking(move || {
        write_shards(&options, &config.path, &config.out_dir)
    })
    .await
    .context("Shard writer panicked")??;

    println!(
        "{} Wrote {} shards ({} bytes of payload) to {}",
        style(symbols::CHECK).green(),
        result.hash_roots.len(),
        result.total_size,
        out_dir.display()
    );
    for (i, root) in result.hash_roots.iter().enumerate() {
        println!("  {}  {}", shard_file_name(i), root);
    }
    Ok(())
}

/// File name used for shard `index`
pub fn shard_file_name(index: usize) -> String {
    format!("shard-{:03}.bin", index)
}

/// Encode `path` into per-shard files under `out_dir`, returning the roots
pub fn write_shards(
    options: &ComputeHashOptions,
    path: &Path,
    out_dir: &Path,
) -> Result<IntegrityResult> {
    let encoder = RedundancyEncoder::new(&options.redundancy, options.redundancy_type)?;
    let mut hasher = RootHasher::new(options.hash_algorithm, encoder.total_shards());

    let input = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut writers = (0..encoder.total_shards())
        .map(|i| {
            let shard_path = out_dir.join(shard_file_name(i));
            File::create(&shard_path)
                .map(BufWriter::new)
                .with_context(|| format!("Failed to create {}", shard_path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut segments = Segmenter::new(BufReader::new(input), options.redundancy.segment_len());
    for segment in segments.by_ref() {
        let pieces = encoder.encode(&segment?)?;
        for (writer, piece) in writers.iter_mut().zip(&pieces) {
            writer.write_all(&piece.data)?;
        }
        hasher.feed_segment(&pieces)?;
    }

    for writer in writers.iter_mut() {
        writer.flush()?;
    }

    info!(
        segments = segments.segment_count(),
        shards = encoder.total_shards(),
        "Wrote shard files"
    );

    Ok(IntegrityResult {
        hash_roots: hasher.finalize(),
        total_size: i64::try_from(segments.bytes_read()).context("Payload too large")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnfd_core::{compute_integrity_hash, HashRoot, RedundancyConfig};
    use tempfile::TempDir;

    #[test]
    fn test_shard_files_match_roots() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("payload.bin");
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 241) as u8).collect();
        fs::write(&input, &data).unwrap();

        let options = ComputeHashOptions::new(RedundancyConfig::new(1024, 4, 2).unwrap());
        let out_dir = dir.path().join("shards");
        let result = write_shards(&options, &input, &out_dir).unwrap();

        let expected = compute_integrity_hash(Some(data.as_slice()), &options).unwrap();
        assert_eq!(result, expected);

        for (i, root) in result.hash_roots.iter().enumerate() {
            let content = fs::read(out_dir.join(shard_file_name(i))).unwrap();
            assert_eq!(HashRoot::compute(options.hash_algorithm, &content), *root);
        }
    }
}
