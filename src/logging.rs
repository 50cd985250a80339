//! Logging setup for sha3sum.
//!
//! Uses the `log` facade with the `env_logger` backend. The level comes from
//! (in priority order):
//!
//! 1. The `RUST_LOG` environment variable, if set
//! 2. `--quiet` (errors only) or `-v`/`-vv` (debug/trace)
//! 3. Default: info
//!
//! Log records go to stderr, so they never mix with dry-run checksum lines
//! on stdout.
//!
//! # Build-specific Formatting
//!
//! - Debug builds: millisecond timestamp, level, and the module path when
//!   verbose
//! - Release builds: level and message only
//!
//! # Timing
//!
//! [`RunTimer`] backs `--timing`: it logs the wall-clock start, end and
//! duration of a run at info level.

use chrono::{DateTime, Local};
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;
use std::io::Write;
use std::time::{Duration, Instant};

/// Initialize the logging subsystem from the CLI verbosity flags.
///
/// Call once, before anything logs.
///
/// # Arguments
///
/// * `verbose` - Count of `-v` flags (0 = info, 1 = debug, 2+ = trace)
/// * `quiet` - Errors only; ignored when `RUST_LOG` is set
///
/// # Panics
///
/// Panics if a global logger has already been installed.
///
/// # Example
///
/// ```rust,no_run
/// use sha3sum::logging::init_logging;
///
/// init_logging(1, false);
/// log::debug!("visible with -v");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) {
    let use_env = env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();
    builder.target(Target::Stderr);

    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    configure_format(&mut builder, verbose);
    builder.init();

    if use_env {
        log::debug!(
            "Logging initialized from RUST_LOG: {:?}",
            env::var("RUST_LOG").ok()
        );
    } else {
        log::debug!("Logging initialized at level: {}", current_level_name());
    }
}

/// Map CLI flags to a level filter. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_millis();
            let level = record.level();
            let level_style = buf.default_level_style(level);

            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}

/// Current maximum log level as a lowercase name.
///
/// # Returns
///
/// One of `off`, `error`, `warn`, `info`, `debug` or `trace`.
#[must_use]
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}

/// Wall-clock and monotonic start of a run, for `--timing`.
///
/// The wall-clock time is only logged; durations come from the monotonic
/// clock, so they stay correct across clock adjustments.
///
/// # Example
///
/// ```rust
/// use sha3sum::logging::RunTimer;
///
/// let timer = RunTimer::start();
/// let elapsed = timer.finish();
/// assert!(elapsed.as_secs() < 60);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RunTimer {
    started_at: DateTime<Local>,
    started: Instant,
}

impl RunTimer {
    /// Record the start time and log it.
    #[must_use]
    pub fn start() -> Self {
        let timer = Self {
            started_at: Local::now(),
            started: Instant::now(),
        };
        log::info!("Start: {}", timer.started_at.to_rfc3339());
        timer
    }

    /// Wall-clock start of the run.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Log the end time and total duration.
    ///
    /// # Returns
    ///
    /// Time elapsed since [`RunTimer::start`].
    pub fn finish(self) -> Duration {
        let elapsed = self.started.elapsed();
        log::info!("End: {}", Local::now().to_rfc3339());
        log::info!("Duration: {:.3?}", elapsed);
        elapsed
    }
}
