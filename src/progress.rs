//! Progress reporting utilities using indicatif.
//!
//! [`Progress`] implements [`ProgressCallback`] and draws one spinner per
//! phase on stderr, so it never interleaves with dry-run output on stdout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress callback for the hashing and persistence phases.
///
/// Implementations must tolerate calls from many worker threads at once.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// `total` is `0` when the number of items is not known up front, which
    /// is always the case for the hashing phase since files are discovered
    /// while they are being hashed.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item as it is picked up.
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);
}

/// Spinner-based progress reporter.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    bytes: AtomicU64,
    items: AtomicU64,
    hidden: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// With `hidden` set, every callback is a no-op.
    ///
    /// # Examples
    ///
    /// ```
    /// use sha3sum::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(hidden: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            bytes: AtomicU64::new(0),
            items: AtomicU64::new(0),
            hidden,
        }
    }

    fn spinner(&self, phase: &str, total: usize) -> ProgressBar {
        let bar = if total == 0 {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::new(total as u64)
        };
        bar.set_draw_target(ProgressDrawTarget::stderr());

        let template = if total == 0 {
            "{spinner:.green} {prefix:.bold} {msg}"
        } else {
            "{spinner:.green} {prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} {msg}"
        };
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_prefix(phase.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.hidden {
            return;
        }
        self.bytes.store(0, Ordering::Relaxed);
        self.items.store(0, Ordering::Relaxed);

        let mut slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = slot.take() {
            old.finish_and_clear();
        }
        *slot = Some(self.spinner(phase, total));
    }

    fn on_progress(&self, current: usize, _path: &str) {
        if self.hidden {
            return;
        }
        if let Some(bar) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            bar.set_position(current as u64);
        }
    }

    fn on_item_completed(&self, bytes: u64) {
        if self.hidden {
            return;
        }
        let total_bytes = self.bytes.fetch_add(bytes, Ordering::Relaxed) + bytes;
        let items = self.items.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(bar) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            bar.set_message(format!("{items} files, {}", ByteSize::b(total_bytes)));
        }
    }

    fn on_phase_end(&self, _phase: &str) {
        if self.hidden {
            return;
        }
        if let Some(bar) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).take() {
            bar.finish_and_clear();
        }
    }
}
