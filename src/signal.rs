//! Ctrl+C handling for graceful shutdown.
//!
//! A shared `AtomicBool` is set when the process receives SIGINT (or
//! SIGTERM, via the `termination` feature of `ctrlc`). The walker stops
//! dispatching new files, in-flight hashing is abandoned at the next buffer
//! boundary, and whatever was already collected is still persisted before
//! the process exits with code 130.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sha3sum::scanner::{Walker, WalkerConfig};
//! use sha3sum::signal::install_handler;
//! use std::path::Path;
//!
//! let handler = install_handler().expect("signal handler");
//! let walker = Walker::new(Path::new("."), WalkerConfig::default())
//!     .with_shutdown_flag(handler.get_flag());
//! ```
//!
//! # Exit Codes
//!
//! On SIGINT or SIGTERM:
//! - the flag flips to `true`
//! - stderr gets "Interrupted. Finishing in-flight work..."
//! - [`crate::RunReport::exit_code`] reports `Interrupted` (130)

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code after an interrupt.
/// Unix convention: 128 plus the signal number (SIGINT = 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared shutdown flag for the walker, the hasher and the persistence drain.
///
/// # Thread Safety
///
/// Clones share one `Arc<AtomicBool>`; every access uses `SeqCst`, so a
/// request made on the signal thread is visible to every hashing worker
/// on its next check.
///
/// # Example
///
/// ```rust
/// use sha3sum::signal::ShutdownHandler;
///
/// let handler = ShutdownHandler::new();
/// let worker_view = handler.clone();
/// handler.request_shutdown();
/// assert!(worker_view.is_shutdown_requested());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request shutdown without a signal.
    ///
    /// Has the same effect as Ctrl+C: dispatch stops and files being
    /// hashed are abandoned at the next buffer boundary.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clone of the flag for the walker and hasher.
    ///
    /// # Returns
    ///
    /// An `Arc<AtomicBool>` shared with this handler, suitable for
    /// [`crate::scanner::Walker::with_shutdown_flag`] and
    /// [`crate::scanner::Hasher::with_shutdown_flag`].
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C handler.
///
/// Call once at startup, before the walk begins. When the signal arrives:
/// 1. the shutdown flag is set
/// 2. a notice is printed to stderr
/// 3. the walker stops dispatching and joins its workers
///
/// Repeated calls (for example from several tests in one process) get the
/// already installed handler back with its flag reset. If some other code
/// owns the signal hook, an unhooked handler is returned that still honors
/// [`ShutdownHandler::request_shutdown`].
///
/// # Returns
///
/// The installed [`ShutdownHandler`], or the one a previous call installed.
///
/// # Errors
///
/// Currently always succeeds; the `Result` leaves room for platforms where
/// installation failure should be fatal.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    let installed = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);

        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Finishing in-flight work...");
        let _ = stderr.flush();

        log::info!("Shutdown signal received");
    });

    match installed {
        Ok(()) => {
            let _ = GLOBAL_HANDLER.set(handler.clone());
            Ok(handler)
        }
        Err(e) => {
            if let Some(existing) = GLOBAL_HANDLER.get() {
                existing.reset();
                return Ok(existing.clone());
            }
            log::debug!("Ctrl+C handler already registered ({}), using unhooked handler", e);
            let fallback = ShutdownHandler::new();
            let _ = GLOBAL_HANDLER.set(fallback.clone());
            Ok(fallback)
        }
    }
}

/// Handler without any signal hook, for tests and embedding.
#[must_use]
pub fn create_handler() -> ShutdownHandler {
    ShutdownHandler::new()
}
