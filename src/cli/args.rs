//! Command-line argument parsing for the fetching cache
//!
//! This module defines the CLI structure using clap derive macros: staging
//! remote resources into a directory through the shared cache, and
//! inspecting or pruning the cache itself.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use url::Url;

/// fetch_cache - Stage remote resources through a shared on-disk cache
#[derive(Parser, Debug)]
#[command(
    name = "fetch_cache",
    version,
    about = "Stage remote resources through a versioned, shared download cache",
    long_about = "Downloads remote resources once per version into a cache shared by every process on the host,
then copies them to the requested location. Concurrent processes coordinate through file locks."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download resources into a directory
    Download(DownloadArgs),

    /// Cache inspection and maintenance
    Cache(CacheArgs),
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Existing directory to place the downloaded files in
    #[arg(short, long, value_name = "DIR")]
    pub destination_dir: PathBuf,

    /// URIs (or local paths) of the resources to download
    #[arg(value_name = "SOURCE_URI", required = true, value_parser = parse_source)]
    pub sources: Vec<Url>,
}

/// Arguments for cache management
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache management actions
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cached resources and their versions
    Info {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove every version but the newest of each resource
    Prune,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level requested on the command line, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

/// Accept either an absolute URI or a local path
fn parse_source(value: &str) -> Result<Url, String> {
    // Single-letter schemes are Windows drive letters
    if let Ok(url) = Url::parse(value) {
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }

    let path = PathBuf::from(value);
    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(|e| format!("Cannot resolve {}: {}", value, e))?
            .join(path)
    };

    Url::from_file_path(&path).map_err(|_| format!("Not a URI or local path: {}", value))
}
