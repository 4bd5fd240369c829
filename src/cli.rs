//! Command-line interface definitions for SnapSweep.
//!
//! Global options (verbosity, JSON errors, config file) come first, then a
//! subcommand:
//!
//! ```bash
//! # Bring the caches up to date with a photo folder
//! snapsweep sync ~/Pictures
//!
//! # Show every category, or only duplicates as JSON
//! snapsweep report ~/Pictures
//! snapsweep report ~/Pictures --category duplicates --output json
//!
//! # Per-category item counts and sizes
//! snapsweep scan ~/Pictures --large-threshold 10MiB
//!
//! # Start over
//! snapsweep clear-cache
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::classify::Category;

/// Incremental photo library cleanup.
///
/// SnapSweep fingerprints thumbnails in parallel, caches the results between
/// runs and groups the library into large files, screenshots, duplicates and
/// burst shots.
#[derive(Debug, Parser)]
#[command(name = "snapsweep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one incremental sync pass
    Sync(SyncArgs),
    /// Sync, then print the sections of each category
    Report(ReportArgs),
    /// Sync, then print item counts and sizes per category
    Scan(ScanArgs),
    /// Delete all cache records
    ClearCache(ClearCacheArgs),
}

/// Options shared by every command that reads a library.
#[derive(Debug, Args, Clone, Default)]
pub struct LibraryArgs {
    /// Root directory of the photo library
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Cache directory (overrides config)
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Number of fingerprint worker threads (overrides config)
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Thumbnail edge length used for fingerprints (overrides config)
    #[arg(long, value_name = "PX")]
    pub thumbnail_size: Option<u32>,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Hide the progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Options that tune classification.
#[derive(Debug, Args, Clone, Default)]
pub struct ClassifyArgs {
    /// Size above which a file is large (e.g. 5MiB, 10MB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub large_threshold: Option<u64>,

    /// Maximum gap between burst shots in milliseconds
    #[arg(long, value_name = "MS")]
    pub burst_window_ms: Option<u64>,
}

/// Arguments for the sync subcommand.
#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub library: LibraryArgs,

    /// Output format for the sync report
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the report subcommand.
#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub library: LibraryArgs,

    #[command(flatten)]
    pub classify: ClassifyArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Only report one category
    #[arg(short, long, value_enum)]
    pub category: Option<CategoryArg>,

    /// Classify from the caches without syncing first
    #[arg(long)]
    pub no_sync: bool,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub library: LibraryArgs,

    #[command(flatten)]
    pub classify: ClassifyArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the clear-cache subcommand.
#[derive(Debug, Args)]
pub struct ClearCacheArgs {
    /// Only clear the cache of this library (default: every library)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Cache directory (overrides config)
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Category selector for `report --category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    All,
    Large,
    Screenshots,
    Duplicates,
    Similar,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::All => Category::All,
            CategoryArg::Large => Category::Large,
            CategoryArg::Screenshots => Category::Screenshots,
            CategoryArg::Duplicates => Category::Duplicates,
            CategoryArg::Similar => Category::Similar,
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use snapsweep::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("5MiB").unwrap(), 5 * 1_048_576);
/// assert_eq!(parse_size("1.5MB").unwrap(), 1_500_000);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1 << 10,
        "MB" | "M" => 1_000_000,
        "MIB" => 1 << 20,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1 << 30,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1 << 40,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
