//! SHA3-512 file hasher with streaming support.
//!
//! # Overview
//!
//! [`Hasher`] reads a file in fixed-size chunks and feeds every chunk into a
//! SHA3-512 accumulator. The byte count it reports is the number of bytes
//! that went through the accumulator, so a file that grows or shrinks
//! between `stat` and `read` still yields a consistent `(digest, size)` pair.
//!
//! # Example
//!
//! ```no_run
//! use sha3sum::scanner::{hash_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let (digest, size) = hasher.hash_file(Path::new("Cargo.toml")).unwrap();
//! println!("{}  {} bytes", hash_to_hex(&digest), size);
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sha3::{Digest as _, Sha3_512};

use super::{Digest, HashError, DIGEST_LEN};

/// Read buffer size used for streaming (64 KiB).
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Streaming SHA3-512 hasher.
///
/// Stateless apart from its settings; one instance is shared by all
/// hashing workers.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: HASH_BUFFER_SIZE,
            shutdown_flag: None,
        }
    }

    /// Override the read buffer size (minimum 1 byte).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Abort in-progress reads once `flag` is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Hash the full contents of the file at `path`.
    ///
    /// Returns the digest and the number of bytes read. The file handle is
    /// closed on every return path.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened, is not a regular
    /// file, or a read fails.
    pub fn hash_file(&self, path: &Path) -> Result<(Digest, u64), HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path.to_path_buf(), e))?;

        let metadata = file
            .metadata()
            .map_err(|e| HashError::from_io(path.to_path_buf(), e))?;
        if !metadata.is_file() {
            return Err(HashError::NotAFile(path.to_path_buf()));
        }

        self.hash_reader(file, path)
    }

    /// Hash everything readable from `reader`.
    ///
    /// `path` is only used to label errors.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] on read failure or when shutdown is requested
    /// before the end of input.
    pub fn hash_reader<R: Read>(
        &self,
        mut reader: R,
        path: &Path,
    ) -> Result<(Digest, u64), HashError> {
        let mut hasher = Sha3_512::new();
        let mut buffer = vec![0u8; self.buffer_size];
        let mut total: u64 = 0;

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }

            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path.to_path_buf(), e)),
            };

            hasher.update(&buffer[..read]);
            total += read as u64;
        }

        Ok((finalize(hasher), total))
    }
}

/// Digest of an in-memory byte slice.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> Digest {
    let mut hasher = Sha3_512::new();
    hasher.update(data);
    finalize(hasher)
}

fn finalize(hasher: Sha3_512) -> Digest {
    let result = hasher.finalize();
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&result);
    digest
}

/// Convert a digest to a lowercase hexadecimal string.
#[must_use]
pub fn hash_to_hex(hash: &Digest) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(DIGEST_LEN * 2);
    for byte in hash {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Parse a hexadecimal string back into a digest.
///
/// Returns `None` if the string is not exactly 128 hex characters.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Digest> {
    if hex.len() != DIGEST_LEN * 2 {
        return None;
    }

    let mut hash = [0u8; DIGEST_LEN];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).ok()?;
        hash[i] = u8::from_str_radix(pair, 16).ok()?;
    }
    Some(hash)
}
