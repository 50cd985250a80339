//! Shared fixtures for the integration tests.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use sha3sum::config::Config;
use tempfile::TempDir;

/// The standard tree used across tests:
///
/// ```text
/// a.txt          "hello"
/// sub/b.txt      "hello"
/// sub/empty.txt  ""
/// sub/locked     unreadable (when the platform and user allow it)
/// ```
pub struct Fixture {
    pub dir: TempDir,
    /// Whether `sub/locked` really cannot be opened.
    pub locked_unreadable: bool,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::write(root.join("a.txt"), b"hello").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/b.txt"), b"hello").unwrap();
        fs::write(root.join("sub/empty.txt"), b"").unwrap();
        fs::write(root.join("sub/locked"), b"secret").unwrap();
        let locked_unreadable = make_unreadable(&root.join("sub/locked"));

        Self {
            dir,
            locked_unreadable,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Number of entries a complete run should produce.
    pub fn expected_entries(&self) -> usize {
        if self.locked_unreadable {
            3
        } else {
            4
        }
    }
}

/// Remove all permissions from `path` and report whether that actually
/// stops it from being opened (it does not for root).
#[cfg(unix)]
pub fn make_unreadable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o000)).unwrap();
    File::open(path).is_err()
}

#[cfg(not(unix))]
pub fn make_unreadable(path: &Path) -> bool {
    let _ = File::open(path);
    false
}

/// Defaults with the root and database redirected into test directories.
pub fn config_for(root: &Path, database: &Path) -> Config {
    let mut config = Config::default();
    config.scan.root = root.to_path_buf();
    config.database.path = database.to_path_buf();
    config
}

pub fn no_shutdown() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}
