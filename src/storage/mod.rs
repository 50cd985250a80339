//! Durable storage of hashed entries.
//!
//! # Architecture
//!
//! * [`EntrySink`]: one durable write per [`Entry`]; implemented by
//!   [`database::SqliteSink`].
//! * [`persist_pool`]: drains a finished [`ResultPool`] into a sink after
//!   the walk has joined.
//! * [`StreamingWriter`] / [`EntryStream`]: the produce-while-consuming
//!   variant. The walk pushes entries into a bounded channel and a dedicated
//!   writer thread stores them as they arrive; dropping the stream closes
//!   the channel and lets the writer finish.
//!
//! # Failure isolation
//!
//! Every record is written as an independent statement. A record that the
//! sink rejects is logged and counted, and the drain moves on; records that
//! were already stored are never rolled back.

pub mod database;

use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::pool::ResultPool;
use crate::progress::ProgressCallback;
use crate::scanner::{CollectError, Entry, EntryCollector};

pub use database::SqliteSink;

/// Errors for a single record write.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// The database rejected the insert.
    #[error("Failed to store {path}: {source}")]
    Database {
        /// Path of the rejected entry
        path: String,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// The entry size does not fit the store's integer column.
    #[error("Size {size} of {path} exceeds the storable range")]
    SizeOutOfRange {
        /// Path of the rejected entry
        path: String,
        /// Size that could not be stored
        size: u64,
    },

    /// The sink refused the record for its own reasons.
    #[error("Rejected {path}: {reason}")]
    Rejected {
        /// Path of the rejected entry
        path: String,
        /// Why the record was refused
        reason: String,
    },
}

/// Errors that make the store unusable as a whole.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// The directory holding the database could not be created.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The database could not be opened or reached.
    #[error("Failed to open database {path}: {source}")]
    Open {
        /// Database location
        path: PathBuf,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// The table could not be created or configured.
    #[error("Failed to prepare database schema: {0}")]
    Schema(#[source] rusqlite::Error),

    /// The writer thread could not be started.
    #[error("Failed to spawn writer thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The writer thread panicked before finishing.
    #[error("Writer thread panicked")]
    WriterPanicked,
}

/// A durable destination for entries.
pub trait EntrySink {
    /// Store one entry.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if this record could not be stored. Callers
    /// treat it as a per-record failure and continue.
    fn store(&mut self, entry: &Entry) -> Result<(), SinkError>;
}

/// Outcome of draining entries into a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistStats {
    /// Records offered to the sink
    pub attempted: usize,
    /// Records stored
    pub stored: usize,
    /// Records the sink rejected
    pub failed: usize,
}

impl PersistStats {
    fn record(&mut self, entry: &Entry, result: Result<(), SinkError>) {
        self.attempted += 1;
        match result {
            Ok(()) => {
                self.stored += 1;
                log::trace!("Inserted: {}", entry.path.display());
            }
            Err(e) => {
                self.failed += 1;
                log::warn!("{}", e);
            }
        }
    }
}

/// Drain a finished pool into `sink`, one independent write per entry.
///
/// Takes the pool by value: once persistence starts, nothing else can
/// write to it.
pub fn persist_pool<S>(
    pool: ResultPool,
    sink: &mut S,
    progress: Option<&dyn ProgressCallback>,
) -> PersistStats
where
    S: EntrySink + ?Sized,
{
    let total = pool.len();
    log::info!("Persisting {} entries", total);
    if let Some(callback) = progress {
        callback.on_phase_start("store", total);
    }

    let mut stats = PersistStats::default();
    for (idx, entry) in pool.into_entries().into_iter().enumerate() {
        let result = sink.store(&entry);
        stats.record(&entry, result);
        if let Some(callback) = progress {
            callback.on_progress(idx + 1, entry.path.to_string_lossy().as_ref());
        }
    }

    if let Some(callback) = progress {
        callback.on_phase_end("store");
    }
    log::info!(
        "Stored {} of {} entries ({} failed)",
        stats.stored,
        stats.attempted,
        stats.failed
    );
    stats
}

/// Store entries as they arrive on `receiver` until every sender is gone.
pub fn persist_stream<S>(receiver: Receiver<Entry>, sink: &mut S) -> PersistStats
where
    S: EntrySink + ?Sized,
{
    let mut stats = PersistStats::default();
    for entry in receiver {
        let result = sink.store(&entry);
        stats.record(&entry, result);
    }
    log::debug!(
        "Entry stream closed after {} entries ({} failed)",
        stats.attempted,
        stats.failed
    );
    stats
}

/// Producer side of a streaming persistence run.
///
/// Sending blocks while the channel is full, which throttles hashing to the
/// speed of the store.
#[derive(Debug)]
pub struct EntryStream {
    sender: Sender<Entry>,
}

impl EntryCollector for EntryStream {
    fn collect(&self, entry: Entry) -> Result<(), CollectError> {
        self.sender
            .send(entry)
            .map_err(|e| CollectError::StreamClosed(e.into_inner().path))
    }
}

/// Dedicated thread that writes streamed entries into a sink.
#[derive(Debug)]
pub struct StreamingWriter {
    handle: JoinHandle<PersistStats>,
}

impl StreamingWriter {
    /// Start the writer thread for `sink` with a channel of `capacity`.
    ///
    /// Returns the writer and the stream to hand to the walker.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Spawn`] if the thread cannot be started.
    pub fn spawn<S>(mut sink: S, capacity: usize) -> Result<(Self, EntryStream), StorageError>
    where
        S: EntrySink + Send + 'static,
    {
        let (sender, receiver) = bounded(capacity.max(1));

        let handle = thread::Builder::new()
            .name("db-writer".into())
            .spawn(move || persist_stream(receiver, &mut sink))
            .map_err(StorageError::Spawn)?;

        Ok((Self { handle }, EntryStream { sender }))
    }

    /// Close `stream` and wait for every queued entry to be stored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriterPanicked`] if the writer thread died.
    pub fn finish(self, stream: EntryStream) -> Result<PersistStats, StorageError> {
        drop(stream);
        let stats = self
            .handle
            .join()
            .map_err(|_| StorageError::WriterPanicked)?;
        log::info!(
            "Stored {} of {} streamed entries ({} failed)",
            stats.stored,
            stats.attempted,
            stats.failed
        );
        Ok(stats)
    }
}
