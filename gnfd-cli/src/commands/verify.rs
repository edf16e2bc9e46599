//! Verify Command
//!
//! Storage-provider side check: digest a stored shard file and compare it with
//! the hash root recorded for that shard index.

use anyhow::{Context, Result};
use console::style;
use gnfd_core::hasher::Accumulator;
use gnfd_core::{HashAlgorithm, HashRoot};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::symbols;

const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Digest a shard file in streaming fashion
pub async fn shard_root(algorithm: HashAlgorithm, path: &Path) -> Result<HashRoot> {
    let mut file = File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut acc = Accumulator::new(algorithm);
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        acc.update(&buf[..n]);
    }
    Ok(acc.finalize())
}

/// Run verify command. Fails when the roots differ.
pub async fn run(algorithm: HashAlgorithm, path: &Path, expected: &str) -> Result<()> {
    let expected = HashRoot::from_hex(expected).context("Invalid expected hash root")?;
    let actual = shard_root(algorithm, path).await?;

    if actual == expected {
        println!(
            "{} {} matches {}",
            style(symbols::CHECK).green(),
            path.display(),
            expected
        );
        Ok(())
    } else {
        println!(
            "{} {} does not match",
            style(symbols::CROSS).red(),
            path.display()
        );
        println!("  expected {}", expected);
        println!("  actual   {}", actual);
        anyhow::bail!("Content integrity check failed for {}", path.display())
    }
}
