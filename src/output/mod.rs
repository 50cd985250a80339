//! Dry-run output: checksum lines instead of database rows.
//!
//! Each entry becomes one line of the form
//!
//! ```text
//! <128 lowercase hex digits><two spaces><path>
//! ```
//!
//! the layout coreutils-style checksum tools print and accept with `-c`.
//! Paths containing a backslash, newline or carriage return are escaped the
//! same way coreutils does: the line starts with `\` and those characters
//! are written as `\\`, `\n` and `\r`.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::scanner::{CollectError, Entry, EntryCollector};

/// Separator between digest and path.
pub const LINE_SEPARATOR: &str = "  ";

/// Format one checksum line (without the trailing newline).
#[must_use]
pub fn format_line(entry: &Entry) -> String {
    let name = entry.path.to_string_lossy();
    match escape_name(&name) {
        Some(escaped) => format!("\\{}{}{}", entry.hex_digest(), LINE_SEPARATOR, escaped),
        None => format!("{}{}{}", entry.hex_digest(), LINE_SEPARATOR, name),
    }
}

/// Escape a file name for a checksum line, or `None` if it needs no escaping.
fn escape_name(name: &str) -> Option<String> {
    if !name.contains(['\\', '\n', '\r']) {
        return None;
    }

    let mut escaped = String::with_capacity(name.len() + 8);
    for c in name.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    Some(escaped)
}

/// Writes every collected entry as a checksum line.
///
/// Writers from different hashing workers are serialized, so lines are
/// never interleaved.
#[derive(Debug)]
pub struct DryRunPrinter<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> DryRunPrinter<W> {
    /// Wrap an output stream.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Flush and return the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the final flush fails.
    pub fn finish(self) -> io::Result<W> {
        let mut out = self.out.into_inner().unwrap_or_else(|e| e.into_inner());
        out.flush()?;
        Ok(out)
    }
}

impl<W: Write + Send> EntryCollector for DryRunPrinter<W> {
    fn collect(&self, entry: Entry) -> Result<(), CollectError> {
        let line = format_line(&entry);
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "{line}").map_err(|source| CollectError::Write {
            path: entry.path,
            source,
        })
    }
}
