//! Scanner module for directory traversal and content hashing.
//!
//! This module provides functionality for:
//! - Walking a directory tree and filtering it down to regular files
//! - Streaming SHA3-512 digests of file contents
//! - Dispatching the hashing work under a configurable concurrency policy
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal, dispatch, and the join barrier
//! - [`hasher`]: SHA3-512 file hashing (streaming)
//!
//! # Example
//!
//! ```no_run
//! use sha3sum::pool::ResultPool;
//! use sha3sum::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let pool = ResultPool::new();
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let summary = walker.run(&pool).expect("root must exist");
//!
//! println!("{} files hashed", summary.files_hashed);
//! pool.for_each(|entry| println!("{}  {}", entry.hex_digest(), entry.path.display()));
//! ```

pub mod hasher;
pub mod walker;

use std::path::PathBuf;
use std::thread;

// Re-export main types
pub use hasher::{hash_to_hex, hex_to_hash, Hasher, HASH_BUFFER_SIZE};
pub use walker::{EntryCollector, WalkSummary, Walker};

/// Length in bytes of a SHA3-512 digest.
pub const DIGEST_LEN: usize = 64;

/// A SHA3-512 content digest.
pub type Digest = [u8; DIGEST_LEN];

/// The record produced for one hashed file.
///
/// `size` is the number of bytes that were actually streamed through the
/// hasher, not the size reported by filesystem metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path of the file as produced by the walk (root-prefixed)
    pub path: PathBuf,
    /// SHA3-512 digest of the content that was read
    pub digest: Digest,
    /// Number of bytes read while hashing
    pub size: u64,
}

impl Entry {
    /// Create a new Entry.
    #[must_use]
    pub fn new(path: PathBuf, digest: Digest, size: u64) -> Self {
        Self { path, digest, size }
    }

    /// Lowercase hexadecimal form of the digest.
    #[must_use]
    pub fn hex_digest(&self) -> String {
        hash_to_hex(&self.digest)
    }

    /// Path rendered as a string for storage.
    ///
    /// Non-UTF-8 components are replaced lossily.
    #[must_use]
    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// How per-file hashing work is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// Hash every file on the walking thread, one after another.
    Inline,
    /// Fixed worker pool fed through a bounded queue.
    ///
    /// The walker blocks once `queue_depth` paths are waiting, so open file
    /// descriptors and queued memory stay proportional to the pool size.
    /// A value of `0` for either field selects the default for the machine.
    Bounded {
        /// Number of hashing threads
        workers: usize,
        /// Maximum number of paths waiting for a worker
        queue_depth: usize,
    },
    /// One task per file on the global rayon pool.
    ///
    /// There is no admission control: every discovered file becomes a queued
    /// task immediately, so very large trees can hold a lot of paths in
    /// memory before the workers catch up.
    Unbounded,
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::Bounded {
            workers: 0,
            queue_depth: 0,
        }
    }
}

impl Concurrency {
    /// Bounded pool with `workers` threads and the default queue depth.
    #[must_use]
    pub fn bounded(workers: usize) -> Self {
        Self::Bounded {
            workers,
            queue_depth: 0,
        }
    }

    /// Resolve `(workers, queue_depth)` for a bounded policy.
    ///
    /// Zero workers means one per available processing unit; zero queue
    /// depth means four slots per worker.
    #[must_use]
    pub fn resolve_bounded(workers: usize, queue_depth: usize) -> (usize, usize) {
        let workers = if workers == 0 {
            thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            workers
        };
        let queue_depth = if queue_depth == 0 {
            workers.saturating_mul(4)
        } else {
            queue_depth
        };
        (workers, queue_depth)
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal. When unset, links to files
    /// are skipped. walkdir reports symlink loops as errors instead of descending forever.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Gitignore-style glob patterns, matched relative to the root.
    pub ignore_patterns: Vec<String>,

    /// Scheduling policy for the hashing work.
    pub concurrency: Concurrency,
}

impl WalkerConfig {
    /// Set whether symbolic links are followed.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set whether hidden entries are skipped.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Set the ignore patterns.
    #[must_use]
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set the concurrency policy.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Fatal errors that stop a walk before it starts.
///
/// Problems with individual entries below the root are logged and counted
/// in [`WalkSummary`] instead.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing the root.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The root path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while inspecting the root.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The hashing thread pool could not be created.
    #[error("Failed to build hashing thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors that can occur while hashing one file.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file was not found (it may have been removed mid-walk).
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when opening or reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path does not resolve to a regular file at open time.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// Hashing was abandoned because shutdown was requested.
    #[error("Interrupted while hashing: {0}")]
    Interrupted(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised for `path`.
    #[must_use]
    pub fn from_io(path: PathBuf, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound => Self::NotFound(path),
            ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io {
                path,
                source: error,
            },
        }
    }
}

/// Errors raised by an [`EntryCollector`] when accepting an entry.
#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    /// The receiving side of an entry stream has gone away.
    #[error("Entry stream closed before {0} could be delivered")]
    StreamClosed(PathBuf),

    /// Writing the entry to an output stream failed.
    #[error("Failed to write entry for {path}: {source}")]
    Write {
        /// Path of the entry being written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
