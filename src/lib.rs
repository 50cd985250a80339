//! sha3sum - concurrent SHA3-512 inventory of a directory tree.
//!
//! Walks a root directory, hashes every regular file with SHA3-512, and
//! records `(path, digest, size)` for each one: as rows in a SQLite table,
//! or as checksum lines on stdout in dry-run mode.
//!
//! The pieces compose as follows:
//!
//! - [`scanner::Walker`] traverses the tree and fans hashing out according to
//!   a [`scanner::Concurrency`] policy, handing each [`scanner::Entry`] to an
//!   [`scanner::EntryCollector`].
//! - [`pool::ResultPool`] collects entries concurrently until the walk joins.
//! - [`storage::persist_pool`] then writes every pooled entry through an
//!   [`storage::EntrySink`], isolating failures per record.
//! - [`storage::StreamingWriter`] instead stores entries while the walk runs.
//! - [`output::DryRunPrinter`] replaces persistence in dry-run mode.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pool;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod storage;

use std::io::{self, BufWriter, IsTerminal, Write};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::Cli;
use crate::config::{Config, OutputMode};
use crate::error::ExitCode;
use crate::logging::RunTimer;
use crate::output::DryRunPrinter;
use crate::pool::ResultPool;
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::{Concurrency, WalkSummary, Walker};
use crate::storage::{persist_pool, PersistStats, SqliteSink, StreamingWriter};

/// Outcome of one complete run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Where entries went
    pub mode: OutputMode,
    /// Walk and hashing counters
    pub walk: WalkSummary,
    /// Persistence counters; `None` in dry-run mode
    pub persisted: Option<PersistStats>,
}

impl RunReport {
    /// Exit code for this outcome. Per-file failures do not affect it.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.walk.interrupted {
            ExitCode::Interrupted
        } else {
            ExitCode::Success
        }
    }
}

/// Run the CLI application: configure, scan, and persist or print.
///
/// # Errors
///
/// Returns an error for fatal conditions only: an invalid configuration, a
/// missing or unreadable root, or a database that cannot be opened.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    Config::ensure_user_config();
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_cli(&cli);

    let handler = signal::install_handler()?;

    let hide_progress = cli.quiet || cli.no_progress || !io::stderr().is_terminal();
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(hide_progress));

    let stdout = BufWriter::new(io::stdout());
    let report = execute(&config, handler.get_flag(), Some(progress), stdout)?;

    if report.walk.interrupted {
        log::warn!("Interrupted; entries hashed before the interrupt were kept");
    }
    Ok(report.exit_code())
}

/// Execute one run with an already assembled configuration.
///
/// Checksum lines are written to `out` in dry-run mode; otherwise `out` is
/// unused. In pool mode the database is opened before the walk starts, so
/// an unusable store fails fast instead of after hashing the whole tree.
///
/// # Errors
///
/// Returns an error if the root cannot be walked, the database cannot be
/// opened, or dry-run output cannot be flushed.
pub fn execute<W>(
    config: &Config,
    shutdown_flag: Arc<AtomicBool>,
    progress: Option<Arc<dyn ProgressCallback>>,
    out: W,
) -> Result<RunReport>
where
    W: Write + Send,
{
    let timer = config.scan.timing.then(RunTimer::start);
    let mode = config.output_mode();
    log::info!(
        "Scanning {} ({:?} mode)",
        config.scan.root.display(),
        mode
    );

    let mut walker =
        Walker::new(&config.scan.root, config.walker_config()).with_shutdown_flag(shutdown_flag);
    if let Some(callback) = &progress {
        walker = walker.with_progress(Arc::clone(callback));
    }

    let report = match mode {
        OutputMode::DryRun => {
            let printer = DryRunPrinter::new(out);
            let walk = walker.run(&printer)?;
            printer
                .finish()
                .context("Failed to flush checksum output")?;
            RunReport {
                mode,
                walk,
                persisted: None,
            }
        }
        OutputMode::Pool => {
            let mut sink = SqliteSink::open(&config.database.path)?;
            let pool = ResultPool::new();
            let walk = walker.run(&pool)?;
            let stats = persist_pool(pool, &mut sink, progress.as_deref());
            RunReport {
                mode,
                walk,
                persisted: Some(stats),
            }
        }
        OutputMode::Stream => {
            let sink = SqliteSink::open(&config.database.path)?;
            let (_, capacity) =
                Concurrency::resolve_bounded(config.scan.workers, config.scan.queue_depth);
            let (writer, stream) = StreamingWriter::spawn(sink, capacity)?;
            // Join the writer even if the walk failed to start.
            let walk = walker.run(&stream);
            let stats = writer.finish(stream)?;
            RunReport {
                mode,
                walk: walk?,
                persisted: Some(stats),
            }
        }
    };

    if let Some(timer) = timer {
        timer.finish();
    }
    Ok(report)
}
