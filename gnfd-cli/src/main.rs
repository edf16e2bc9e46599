//! Greenfield integrity hashing CLI
//!
//! Computes the per-shard hash roots of a payload before it is uploaded, and
//! checks stored shards against those roots.
//!
//! # Commands
//! - `hash` - Compute hash roots and payload size of a file
//! - `shards` - Write per-shard files as storage providers hold them
//! - `verify` - Check a stored shard file against its hash root
//! - `config` - Show or initialize configuration
//!
//! # Configuration
//! Config file: ~/.gnfd/config.toml

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use gnfd_core::HashAlgorithm;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;

mod commands;
mod config;
mod symbols;

use commands::{hash, shards};
use config::Overrides;

#[derive(Parser)]
#[command(name = "gnfd-hash")]
#[command(about = "Greenfield redundancy-aware integrity hashing")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.gnfd/config.toml)
    #[arg(long, global = true, env = "GNFD_CONFIG")]
    config: Option<PathBuf>,

    /// Segment size in bytes
    #[arg(long, global = true)]
    segment_size: Option<u64>,

    /// Number of data shards
    #[arg(long, global = true)]
    data_shards: Option<u32>,

    /// Number of parity shards
    #[arg(long, global = true)]
    parity_shards: Option<u32>,

    /// Digest for hash roots (sha256, blake3)
    #[arg(long, global = true)]
    algorithm: Option<HashAlgorithm>,

    /// Replicate segments instead of erasure coding
    #[arg(long, global = true)]
    replica: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute hash roots and payload size of a file
    Hash {
        /// File to hash
        path: PathBuf,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,

        /// Bucket name; with --object prints the object-creation payload
        #[arg(short, long)]
        bucket: Option<String>,

        /// Object name
        #[arg(short, long)]
        object: Option<String>,

        /// Content type of the object
        #[arg(long)]
        content_type: Option<String>,

        /// Make the object public
        #[arg(long)]
        public: bool,
    },

    /// Write one file per shard into a directory
    Shards {
        /// File to encode
        path: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "shards")]
        out_dir: PathBuf,
    },

    /// Check a stored shard file against its hash root
    Verify {
        /// Shard file
        path: PathBuf,

        /// Expected hash root (hex)
        #[arg(short, long)]
        root: String,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show effective configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let overrides = Overrides {
        segment_size: cli.segment_size,
        data_shards: cli.data_shards,
        parity_shards: cli.parity_shards,
        algorithm: cli.algorithm,
        replica: cli.replica,
    };

    // `config init` must work before the file exists
    if let Commands::Config {
        command: Some(ConfigCommands::Init { force }),
    } = cli.command
    {
        return init_config(cli.config, force);
    }

    // Priority: CLI args > env > config file > defaults
    let cfg = config::load_config(cli.config.as_deref())?
        .with_env_overrides()
        .with_overrides(&overrides);
    debug!(?cfg, "Effective configuration");

    // Ctrl-C stops hashing at the next segment boundary
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Hash {
            path,
            json,
            bucket,
            object,
            content_type,
            public,
        } => {
            let config = hash::HashConfig {
                path,
                json,
                bucket,
                object,
                content_type,
                public,
            };
            commands::hash(cfg.hash_options()?, config, cancel).await?;
        }

        Commands::Shards { path, out_dir } => {
            let config = shards::ShardsConfig { path, out_dir };
            commands::shards(cfg.hash_options()?, config).await?;
        }

        Commands::Verify { path, root } => {
            commands::verify(cfg.hash.algorithm, &path, &root).await?;
        }

        Commands::Config { command } => {
            handle_config_command(command, &cfg, cli.config)?;
        }
    }

    Ok(())
}

/// Handle config subcommands
fn handle_config_command(
    command: Option<ConfigCommands>,
    cfg: &config::GnfdConfig,
    explicit_path: Option<PathBuf>,
) -> Result<()> {
    let path = match explicit_path {
        Some(path) => path,
        None => config::config_file_path()?,
    };

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", style("Effective Configuration").bold().underlined());
            println!();
            print!("{}", toml::to_string_pretty(cfg)?);
            println!();

            println!("{} {}", style("Config file:").dim(), path.display());
            if !path.exists() {
                println!(
                    "{} Run '{}' to create it",
                    style("(not created yet)").yellow(),
                    style("gnfd-hash config init").green()
                );
            }
        }

        Some(ConfigCommands::Path) => {
            println!("{}", path.display());
        }

        Some(ConfigCommands::Init { force }) => {
            return init_config(Some(path), force);
        }
    }

    Ok(())
}

/// Write a default config file
fn init_config(explicit_path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match explicit_path {
        Some(path) => path,
        None => config::config_file_path()?,
    };

    if path.exists() && !force {
        println!(
            "{} Config file already exists at {}",
            style("!").yellow(),
            path.display()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&config::GnfdConfig::default(), &path)?;
    println!(
        "{} Config file created at {}",
        style(symbols::CHECK).green(),
        path.display()
    );
    Ok(())
}
