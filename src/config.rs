//! Layered application configuration.
//!
//! Values are merged from, lowest to highest precedence:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. `/etc/sha3sum.toml` (Unix only)
//! 3. `sha3sum.toml` in the platform config directory
//! 4. A file passed with `--config`
//! 5. Environment variables prefixed `SHA3SUM_`, with `__` separating
//!    sections from keys (`SHA3SUM_SCAN__WORKERS=8`)
//! 6. Command-line flags ([`Config::apply_cli`])
//!
//! ```toml
//! [database]
//! path = "/var/lib/sha3sum/sums.db"
//!
//! [scan]
//! root = "/srv/data"
//! concurrency = "bounded"
//! workers = 8
//! ignore = ["*.tmp", ".cache/"]
//! ```

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::cli::{Cli, ConcurrencyArg};
use crate::scanner::{Concurrency, WalkerConfig};

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "SHA3SUM_";

/// File name looked up in each configuration directory.
pub const CONFIG_FILE_NAME: &str = "sha3sum.toml";

#[cfg(unix)]
const SYSTEM_CONFIG_PATH: &str = "/etc/sha3sum.toml";

/// Errors raised while assembling the configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has the wrong shape.
    #[error("Invalid configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// The defaults could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The config file could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Target file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record store settings
    pub database: DatabaseConfig,
    /// Walk and hashing settings
    pub scan: ScanConfig,
}

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file rows are appended to
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = ProjectDirs::from("", "", "sha3sum").map_or_else(
            || PathBuf::from("sha3sum.db"),
            |dirs| dirs.data_dir().join("sha3sum.db"),
        );
        Self { path }
    }
}

/// `[scan]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory to walk
    pub root: PathBuf,
    /// Scheduling policy
    pub concurrency: ConcurrencyArg,
    /// Hashing threads for the bounded policy (0 = one per CPU)
    pub workers: usize,
    /// Queue slots for the bounded policy (0 = four per worker)
    pub queue_depth: usize,
    /// Follow symbolic links; linked files are skipped when unset
    pub follow_symlinks: bool,
    /// Skip dot files and directories
    pub skip_hidden: bool,
    /// Gitignore-style exclusion patterns
    pub ignore: Vec<String>,
    /// Print checksum lines instead of storing rows
    pub dry_run: bool,
    /// Store rows while the walk runs
    pub stream: bool,
    /// Log start, end and duration
    pub timing: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            concurrency: ConcurrencyArg::Bounded,
            workers: 0,
            queue_depth: 0,
            follow_symlinks: false,
            skip_hidden: false,
            ignore: Vec::new(),
            dry_run: false,
            stream: false,
            timing: false,
        }
    }
}

impl ScanConfig {
    /// Scheduling policy described by this section.
    #[must_use]
    pub fn concurrency(&self) -> Concurrency {
        match self.concurrency {
            ConcurrencyArg::Bounded => Concurrency::Bounded {
                workers: self.workers,
                queue_depth: self.queue_depth,
            },
            ConcurrencyArg::Unbounded => Concurrency::Unbounded,
            ConcurrencyArg::Inline => Concurrency::Inline,
        }
    }
}

/// Where hashed entries end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Checksum lines on stdout, no database
    DryRun,
    /// Collect into the result pool, then persist
    Pool,
    /// Persist while walking
    Stream,
}

impl Config {
    /// Load the full layered configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if `explicit` is given but missing,
    /// or [`ConfigError::Extract`] if any layer is malformed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
        }
        Self::from_figment(Self::figment(explicit))
    }

    /// Extract a configuration from an assembled figment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Extract`] if the merged values do not fit.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        log::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Build the provider stack without extracting it.
    #[must_use]
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        for path in Self::search_paths() {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Config files consulted before `--config`, lowest precedence first.
    #[must_use]
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        #[cfg(unix)]
        paths.push(PathBuf::from(SYSTEM_CONFIG_PATH));
        if let Some(path) = Self::user_config_path() {
            paths.push(path);
        }
        paths
    }

    /// Platform-specific per-user config file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sha3sum").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Write the default configuration to `path` unless a file is already there.
    ///
    /// Returns `true` if a file was created.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Write`] if the directory or file cannot be
    /// created.
    pub fn write_default_if_missing(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }

        let content = toml::to_string_pretty(&Self::default())?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        // create_new loses cleanly against a concurrent writer.
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(write_err(e)),
        };
        file.write_all(content.as_bytes()).map_err(write_err)?;
        Ok(true)
    }

    /// Seed the per-user config file with defaults on first run.
    ///
    /// Failures are logged and ignored.
    pub fn ensure_user_config() {
        let Some(path) = Self::user_config_path() else {
            log::debug!("No user config directory on this platform");
            return;
        };
        match Self::write_default_if_missing(&path) {
            Ok(true) => log::info!("Wrote default configuration to {}", path.display()),
            Ok(false) => {}
            Err(e) => log::debug!("Could not write default configuration: {}", e),
        }
    }

    /// Apply command-line overrides on top of the loaded layers.
    ///
    /// Boolean switches can only turn a setting on; ignore patterns are
    /// added to the configured ones.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(root) = &cli.root {
            self.scan.root.clone_from(root);
        }
        if let Some(database) = &cli.database {
            self.database.path.clone_from(database);
        }
        if let Some(concurrency) = cli.concurrency {
            self.scan.concurrency = concurrency;
        }
        if let Some(workers) = cli.workers {
            self.scan.workers = workers;
        }
        if let Some(depth) = cli.queue_depth {
            self.scan.queue_depth = depth;
        }

        self.scan.follow_symlinks |= cli.follow_symlinks;
        self.scan.skip_hidden |= cli.skip_hidden;
        self.scan.dry_run |= cli.dry_run;
        self.scan.stream |= cli.stream;
        self.scan.timing |= cli.timing;
        self.scan
            .ignore
            .extend(cli.ignore_patterns.iter().cloned());
    }

    /// Walker settings derived from the `[scan]` section.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::default()
            .with_follow_symlinks(self.scan.follow_symlinks)
            .with_skip_hidden(self.scan.skip_hidden)
            .with_ignore_patterns(self.scan.ignore.clone())
            .with_concurrency(self.scan.concurrency())
    }

    /// Destination of hashed entries.
    ///
    /// Dry run wins over streaming.
    #[must_use]
    pub fn output_mode(&self) -> OutputMode {
        if self.scan.dry_run {
            OutputMode::DryRun
        } else if self.scan.stream {
            OutputMode::Stream
        } else {
            OutputMode::Pool
        }
    }
}
