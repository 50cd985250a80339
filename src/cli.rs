//! Command-line interface definitions for sha3sum.
//!
//! Every flag here overrides the matching key of the layered configuration
//! (see [`crate::config`]); flags left unset keep the configured value.
//!
//! # Example
//!
//! ```bash
//! # Hash a tree into the configured database
//! sha3sum --root /srv/data
//!
//! # Print checksum lines instead of storing them
//! sha3sum --root /srv/data --dry-run
//!
//! # Eight hashing threads, store rows while the walk is still running
//! sha3sum -r /srv/data -j 8 --stream
//! ```

use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Concurrent SHA3-512 inventory of a directory tree.
///
/// Walks a directory, computes the SHA3-512 digest of every regular file, and
/// records `(path, digest, size)` in a SQLite database, or prints checksum
/// lines in dry-run mode.
#[derive(Debug, Parser)]
#[command(name = "sha3sum")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Root directory to walk
    #[arg(short, long, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Additional configuration file (TOML), applied above the default locations
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SQLite database to append rows to
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Scheduling policy for per-file hashing
    #[arg(long, value_enum, value_name = "POLICY")]
    pub concurrency: Option<ConcurrencyArg>,

    /// Number of hashing threads for the bounded policy (0 = one per CPU)
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Paths allowed to wait for a hashing thread (0 = four per worker)
    #[arg(long, value_name = "N")]
    pub queue_depth: Option<usize>,

    /// Print checksum lines to stdout instead of writing to the database
    #[arg(long, alias = "nodb")]
    pub dry_run: bool,

    /// Write rows while the walk is running instead of after it finishes
    #[arg(long, conflicts_with = "dry_run")]
    pub stream: bool,

    /// Follow symbolic links during the walk
    ///
    /// Without this flag, links to files are skipped rather than hashed
    /// under the link's path, and linked directories are not entered.
    /// Symlink loops are reported and skipped.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Glob patterns to ignore (can be specified multiple times)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Log start, end and duration of the run
    #[arg(long)]
    pub timing: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

/// Scheduling policy selectable from the command line and config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyArg {
    /// Fixed worker pool with a bounded queue
    #[default]
    Bounded,
    /// One task per file, no admission control
    Unbounded,
    /// Hash on the walking thread
    Inline,
}

impl std::fmt::Display for ConcurrencyArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bounded => write!(f, "bounded"),
            Self::Unbounded => write!(f, "unbounded"),
            Self::Inline => write!(f, "inline"),
        }
    }
}
