//! Directory walker that dispatches one hashing job per regular file.
//!
//! # Overview
//!
//! [`Walker`] traverses the tree below a root directory with `walkdir` on
//! the calling (coordinating) thread. Every regular file it meets is hashed
//! according to the configured [`Concurrency`] policy, and each finished
//! [`Entry`] is handed to an [`EntryCollector`]:
//!
//! - [`Concurrency::Inline`]: hashed on the coordinating thread
//! - [`Concurrency::Bounded`]: sent through a bounded crossbeam queue to a
//!   dedicated rayon pool; the walk blocks while the queue is full
//! - [`Concurrency::Unbounded`]: spawned as one task per file on the global
//!   rayon pool
//!
//! [`Walker::run`] returns only after every dispatched job has finished and
//! its entry has been handed over, so the collector can be read as soon as
//! it returns.
//!
//! Errors below the root (unreadable directories, vanished files, broken
//! links, files that fail to hash) are logged, counted, and skipped. Only a
//! missing or unreadable root aborts the walk; a regular file as the root
//! yields a single entry.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::{DirEntry, WalkDir};

use super::hasher::Hasher;
use super::{CollectError, Concurrency, Entry, HashError, ScanError, WalkerConfig};
use crate::progress::ProgressCallback;

/// Destination for entries produced by the walk.
///
/// `collect` is called concurrently from every hashing worker, so
/// implementations must synchronize internally.
pub trait EntryCollector: Sync {
    /// Accept one finished entry.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError`] if the entry could not be delivered. The
    /// walker logs the failure and keeps going.
    fn collect(&self, entry: Entry) -> Result<(), CollectError>;
}

/// Counters reported after a walk has joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Regular files discovered and dispatched for hashing
    pub files_seen: usize,
    /// Files hashed successfully
    pub files_hashed: usize,
    /// Total bytes read while hashing
    pub bytes_hashed: u64,
    /// Traversal errors (unreadable directories, loops, vanished entries)
    pub walk_errors: usize,
    /// Files that failed to open or read
    pub hash_errors: usize,
    /// Entries the collector refused
    pub collect_errors: usize,
    /// Whether the walk stopped early because shutdown was requested
    pub interrupted: bool,
    /// Wall-clock time from start of traversal to the join barrier
    pub duration: Duration,
}

impl WalkSummary {
    /// Total number of non-fatal problems encountered.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.walk_errors + self.hash_errors + self.collect_errors
    }
}

#[derive(Default)]
struct WalkCounters {
    files_seen: AtomicUsize,
    files_hashed: AtomicUsize,
    bytes_hashed: AtomicU64,
    walk_errors: AtomicUsize,
    hash_errors: AtomicUsize,
    collect_errors: AtomicUsize,
}

impl WalkCounters {
    fn summary(&self, interrupted: bool, duration: Duration) -> WalkSummary {
        WalkSummary {
            files_seen: self.files_seen.load(Ordering::Relaxed),
            files_hashed: self.files_hashed.load(Ordering::Relaxed),
            bytes_hashed: self.bytes_hashed.load(Ordering::Relaxed),
            walk_errors: self.walk_errors.load(Ordering::Relaxed),
            hash_errors: self.hash_errors.load(Ordering::Relaxed),
            collect_errors: self.collect_errors.load(Ordering::Relaxed),
            interrupted,
            duration,
        }
    }
}

/// Directory walker and hashing dispatcher.
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Shared digest engine
    hasher: Hasher,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress reporting
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given root.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sha3sum::scanner::{Walker, WalkerConfig};
    /// use std::path::Path;
    ///
    /// let walker = Walker::new(Path::new("."), WalkerConfig::default());
    /// ```
    #[must_use]
    pub fn new(root: &Path, config: WalkerConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            hasher: Hasher::new(),
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// Once the flag is set no new files are dispatched, hashing in
    /// progress is abandoned, and the walk joins as soon as running jobs
    /// have returned.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.hasher = self.hasher.with_shutdown_flag(Arc::clone(&flag));
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Root of the walk.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the tree and hash every regular file into `collector`.
    ///
    /// Blocks until every dispatched hashing job has completed.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] only for fatal conditions: the root is missing
    /// or unreadable, or the worker pool cannot be built. A regular file
    /// given as the root is hashed as a single entry.
    pub fn run<C>(&self, collector: &C) -> Result<WalkSummary, ScanError>
    where
        C: EntryCollector + ?Sized,
    {
        self.check_root()?;

        let gitignore = self.build_gitignore();
        let counters = WalkCounters::default();
        let started = Instant::now();

        if let Some(ref callback) = self.progress {
            callback.on_phase_start("hash", 0);
        }

        match self.config.concurrency {
            Concurrency::Inline => {
                log::debug!("Hashing inline on the walking thread");
                for path in self.files(&gitignore, &counters) {
                    self.hash_into(path, collector, &counters);
                }
            }
            Concurrency::Unbounded => {
                log::debug!(
                    "Hashing with one task per file on the global pool ({} threads)",
                    rayon::current_num_threads()
                );
                let counters = &counters;
                rayon::in_place_scope(|scope| {
                    for path in self.files(&gitignore, counters) {
                        scope.spawn(move |_| self.hash_into(path, collector, counters));
                    }
                });
            }
            Concurrency::Bounded {
                workers,
                queue_depth,
            } => {
                let (workers, queue_depth) = Concurrency::resolve_bounded(workers, queue_depth);
                log::debug!(
                    "Hashing with {} workers behind a queue of {}",
                    workers,
                    queue_depth
                );
                self.run_bounded(workers, queue_depth, &gitignore, collector, &counters)?;
            }
        }

        if let Some(ref callback) = self.progress {
            callback.on_phase_end("hash");
        }

        let summary = counters.summary(self.is_shutdown_requested(), started.elapsed());
        log::info!(
            "Hashed {} of {} files ({} bytes) in {:.2?}; {} errors",
            summary.files_hashed,
            summary.files_seen,
            summary.bytes_hashed,
            summary.duration,
            summary.error_count()
        );
        Ok(summary)
    }

    /// Fixed pool of workers draining a bounded queue of paths.
    fn run_bounded<C>(
        &self,
        workers: usize,
        queue_depth: usize,
        gitignore: &Option<Gitignore>,
        collector: &C,
        counters: &WalkCounters,
    ) -> Result<(), ScanError>
    where
        C: EntryCollector + ?Sized,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sha3sum-hash-{i}"))
            .build()?;

        let (sender, receiver) = bounded::<PathBuf>(queue_depth);

        pool.in_place_scope(move |scope| {
            for _ in 0..workers {
                let receiver = receiver.clone();
                scope.spawn(move |_| {
                    for path in receiver.iter() {
                        self.hash_into(path, collector, counters);
                    }
                });
            }
            drop(receiver);

            for path in self.files(gitignore, counters) {
                if sender.send(path).is_err() {
                    log::warn!("All hashing workers exited early; stopping dispatch");
                    break;
                }
            }
            // Closing the queue lets the workers drain it and return.
            drop(sender);
        });

        Ok(())
    }

    /// Validate the root before anything is dispatched.
    fn check_root(&self) -> Result<(), ScanError> {
        use std::io::ErrorKind;

        let metadata = fs::metadata(&self.root).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ScanError::NotFound(self.root.clone()),
            ErrorKind::PermissionDenied => ScanError::PermissionDenied(self.root.clone()),
            _ => ScanError::Io {
                path: self.root.clone(),
                source: e,
            },
        })?;

        if !metadata.is_dir() {
            log::debug!("Root {} is not a directory; hashing it alone", self.root.display());
        }
        Ok(())
    }

    /// Build a matcher from the configured ignore patterns.
    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    fn should_ignore(&self, path: &Path, is_dir: bool, gitignore: &Option<Gitignore>) -> bool {
        let Some(gi) = gitignore else {
            return false;
        };
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        gi.matched(relative, is_dir).is_ignore()
    }

    /// Whether a directory entry should be pruned before it is visited.
    fn should_prune(&self, entry: &DirEntry, gitignore: &Option<Gitignore>) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        if self.config.skip_hidden && is_hidden(entry) {
            log::trace!("Skipping hidden entry: {}", entry.path().display());
            return true;
        }
        if self.should_ignore(entry.path(), entry.file_type().is_dir(), gitignore) {
            log::trace!("Ignoring: {}", entry.path().display());
            return true;
        }
        false
    }

    /// Lazily enumerate the regular files below the root.
    ///
    /// Traversal errors are logged and counted; the walk continues with the
    /// next sibling.
    fn files<'a>(
        &'a self,
        gitignore: &'a Option<Gitignore>,
        counters: &'a WalkCounters,
    ) -> impl Iterator<Item = PathBuf> + 'a {
        WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .into_iter()
            .filter_entry(move |entry| !self.should_prune(entry, gitignore))
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping dispatch");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |result| match result {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_file() {
                        let seen = counters.files_seen.fetch_add(1, Ordering::Relaxed) + 1;
                        if let Some(ref callback) = self.progress {
                            callback.on_progress(seen, entry.path().to_string_lossy().as_ref());
                        }
                        Some(entry.into_path())
                    } else {
                        if file_type.is_symlink() {
                            log::trace!("Skipping symlink: {}", entry.path().display());
                        } else if !file_type.is_dir() {
                            log::trace!("Skipping special file: {}", entry.path().display());
                        }
                        None
                    }
                }
                Err(e) => {
                    counters.walk_errors.fetch_add(1, Ordering::Relaxed);
                    match e.path() {
                        Some(path) => log::warn!("Walker error for {}: {}", path.display(), e),
                        None => log::warn!("Walker error: {}", e),
                    }
                    None
                }
            })
    }

    /// Hash one file and hand the entry to the collector.
    fn hash_into<C>(&self, path: PathBuf, collector: &C, counters: &WalkCounters)
    where
        C: EntryCollector + ?Sized,
    {
        if self.is_shutdown_requested() {
            return;
        }

        match self.hasher.hash_file(&path) {
            Ok((digest, size)) => {
                log::trace!("Hashed {} ({} bytes)", path.display(), size);
                counters.files_hashed.fetch_add(1, Ordering::Relaxed);
                counters.bytes_hashed.fetch_add(size, Ordering::Relaxed);
                if let Some(ref callback) = self.progress {
                    callback.on_item_completed(size);
                }

                if let Err(e) = collector.collect(Entry::new(path, digest, size)) {
                    counters.collect_errors.fetch_add(1, Ordering::Relaxed);
                    log::warn!("{}", e);
                }
            }
            Err(HashError::Interrupted(path)) => {
                log::debug!("Hashing abandoned for {}", path.display());
            }
            Err(e) => {
                counters.hash_errors.fetch_add(1, Ordering::Relaxed);
                log::warn!("Failed to hash {}: {}", path.display(), e);
            }
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
