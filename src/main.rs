//! shardfs - mount a source tree as N erasure-coded share views
//!
//! ```text
//! shardfs /data /mnt/shares -k 3 -n 5
//! ls /mnt/shares          # 00 01 02 03 04
//! cat /mnt/shares/02/x    # share 2 of /data/x, self-describing header first
//! ```
//!
//! Any K of the share sub-trees reconstruct the originals; the shares are
//! produced lazily by reads and never stored.

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shardfs::error::Result;
use shardfs::vfs::{ShareTree, ShareTreeConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Read-only FUSE view presenting a source tree as N erasure-coded shares
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to present as encoded shares
    source: PathBuf,

    /// Where to mount the share view
    mountpoint: PathBuf,

    /// Minimum number of shares needed to reconstruct (K)
    #[arg(short = 'k', long, env = "SHARDFS_SHARES_REQUIRED")]
    shares_required: usize,

    /// Total number of shares presented (N)
    #[arg(short = 'n', long, env = "SHARDFS_NUM_SHARES")]
    num_shares: usize,

    /// Allow other users to access the mount
    #[arg(long)]
    allow_other: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting shardfs");
    info!("  Source: {}", args.source.display());
    info!("  Mountpoint: {}", args.mountpoint.display());
    info!(
        "  Coding: {} of {} shares",
        args.shares_required, args.num_shares
    );

    let tree = ShareTree::new(ShareTreeConfig {
        shares_required: args.shares_required,
        num_shares: args.num_shares,
        source: args.source.clone(),
    })?;

    run(tree, &args)
}

#[cfg(feature = "fuse")]
fn run(tree: ShareTree, args: &Args) -> Result<()> {
    let options = shardfs::fuse::MountOptions {
        allow_other: args.allow_other,
        ..Default::default()
    };
    shardfs::fuse::mount(tree, &args.mountpoint, &options)?;
    info!("shardfs shut down");
    Ok(())
}

#[cfg(not(feature = "fuse"))]
fn run(_tree: ShareTree, _args: &Args) -> Result<()> {
    Err(shardfs::error::Error::Internal(
        "this build has no FUSE support; rebuild with the `fuse` feature to mount".to_string(),
    ))
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
