//! Hash Command
//!
//! Computes the per-shard hash roots and payload size of a local file, or the
//! full object-creation payload when a bucket and object name are given.

use anyhow::{Context, Result};
use console::style;
use gnfd_core::{
    ComputeHashOptions, CreateObjectRequest, GnfdError, IntegrityHasher, IntegrityResult,
    RedundancyType,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tokio_util::sync::CancellationToken;

/// Hash configuration
pub struct HashConfig {
    pub path: PathBuf,
    pub json: bool,
    pub bucket: Option<String>,
    pub object: Option<String>,
    pub content_type: Option<String>,
    pub public: bool,
}

#[derive(Serialize)]
struct HashOutput<'a> {
    options: &'a ComputeHashOptions,
    #[serde(flatten)]
    result: &'a IntegrityResult,
}

/// Run hash command
pub async fn run(
    options: ComputeHashOptions,
    config: HashConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let file = fs::File::open(&config.path)
        .await
        .with_context(|| format!("Failed to open {}", config.path.display()))?;
    let size = file.metadata().await?.len();

    let machine_output = config.json || config.bucket.is_some();
    let pb = if machine_output {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    };

    let result = IntegrityHasher::new(options)
        .with_cancellation(cancel)
        .hash_async_reader(Some(pb.wrap_async_read(file)))
        .await;
    pb.finish_and_clear();

    let result = match result {
        Err(GnfdError::Cancelled) => anyhow::bail!("Interrupted"),
        other => other.context("Failed to compute hash roots")?,
    };

    match (config.bucket, config.object) {
        (Some(bucket), Some(object)) => {
            let request = CreateObjectRequest::new(bucket, object, &result, &options)
                .with_public(config.public)
                .with_content_type(config.content_type.unwrap_or_default());
            println!("{}", request.to_json()?);
        }
        (Some(_), None) | (None, Some(_)) => {
            anyhow::bail!("--bucket and --object must be given together");
        }
        (None, None) if config.json => {
            let output = HashOutput {
                options: &options,
                result: &result,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        (None, None) => print!("{}", render_text(&options, &result)),
    }

    Ok(())
}

/// Human-readable listing of the roots
pub fn render_text(options: &ComputeHashOptions, result: &IntegrityResult) -> String {
    let data_shards = options.redundancy.data_shards as usize;
    let mut out = String::new();

    let layout = match options.redundancy_type {
        RedundancyType::Replica => format!("{} replicas", options.redundancy.total_shards()),
        RedundancyType::ErasureCoded => format!(
            "{} data + {} parity",
            options.redundancy.data_shards, options.redundancy.parity_shards
        ),
    };
    out.push_str(&format!(
        "{} {} bytes, {} ({}), {}\n",
        style("Size:").bold(),
        result.total_size,
        options.redundancy_type,
        options.hash_algorithm,
        layout,
    ));

    for (i, root) in result.hash_roots.iter().enumerate() {
        let kind = match options.redundancy_type {
            RedundancyType::Replica => "replica",
            RedundancyType::ErasureCoded if i < data_shards => "data",
            RedundancyType::ErasureCoded => "parity",
        };
        out.push_str(&format!("  [{:>3}] {} {}\n", i, root, style(kind).dim()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnfd_core::{HashAlgorithm, HashRoot, RedundancyConfig};

    #[test]
    fn test_render_text_lists_every_root() {
        console::set_colors_enabled(false);
        let options = ComputeHashOptions::new(RedundancyConfig::new(1024, 2, 1).unwrap());
        let result = IntegrityResult {
            hash_roots: vec![HashRoot::empty(HashAlgorithm::Sha256); 3],
            total_size: 0,
        };

        let text = render_text(&options, &result);
        assert!(text.contains("0 bytes"));
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().nth(3).unwrap().ends_with("parity"));
        assert!(text.contains(&HashRoot::empty(HashAlgorithm::Sha256).to_hex()));
    }

    #[test]
    fn test_render_text_labels_replicas() {
        console::set_colors_enabled(false);
        let options = ComputeHashOptions::new(RedundancyConfig::new(1024, 2, 1).unwrap())
            .with_redundancy_type(RedundancyType::Replica);
        let result = IntegrityResult {
            hash_roots: vec![HashRoot::empty(HashAlgorithm::Sha256); 3],
            total_size: 0,
        };

        let text = render_text(&options, &result);
        let labels: Vec<&str> = text
            .lines()
            .skip(1)
            .filter_map(|line| line.split_whitespace().last())
            .collect();
        assert_eq!(labels, vec!["replica"; 3]);
    }
}
