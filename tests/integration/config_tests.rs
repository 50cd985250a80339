use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use sha3sum::cli::ConcurrencyArg;
use sha3sum::config::{Config, OutputMode, ENV_PREFIX};
use sha3sum::scanner::Concurrency;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Defaults only, so the environment cannot interfere.
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config = Config::from_figment(figment).unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(
        config.scan.concurrency(),
        Concurrency::Bounded {
            workers: 0,
            queue_depth: 0
        }
    );
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("SHA3SUM_TEST_SCAN__WORKERS", "16");
    std::env::set_var("SHA3SUM_TEST_SCAN__CONCURRENCY", "unbounded");
    std::env::set_var("SHA3SUM_TEST_DATABASE__PATH", "/tmp/env.db");

    // A private prefix keeps this test independent of the real one.
    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("SHA3SUM_TEST_").split("__"));
    let config = Config::from_figment(figment).unwrap();

    assert_eq!(config.scan.workers, 16);
    assert_eq!(config.scan.concurrency, ConcurrencyArg::Unbounded);
    assert_eq!(config.database.path, PathBuf::from("/tmp/env.db"));

    std::env::remove_var("SHA3SUM_TEST_SCAN__WORKERS");
    std::env::remove_var("SHA3SUM_TEST_SCAN__CONCURRENCY");
    std::env::remove_var("SHA3SUM_TEST_DATABASE__PATH");
}

#[test]
fn test_env_prefix() {
    assert_eq!(ENV_PREFIX, "SHA3SUM_");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("sha3sum.toml");
    fs::write(
        &config_path,
        r#"
[database]
path = "/var/lib/sha3sum/sums.db"

[scan]
root = "/srv/data"
concurrency = "inline"
follow_symlinks = true
skip_hidden = true
ignore = ["*.tmp", "cache/"]
dry_run = true
timing = true
"#,
    )
    .unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let config = Config::from_figment(figment).unwrap();

    assert_eq!(config.database.path, PathBuf::from("/var/lib/sha3sum/sums.db"));
    assert_eq!(config.scan.root, PathBuf::from("/srv/data"));
    assert_eq!(config.scan.concurrency(), Concurrency::Inline);
    assert!(config.scan.follow_symlinks);
    assert!(config.scan.skip_hidden);
    assert_eq!(config.scan.ignore, vec!["*.tmp", "cache/"]);
    assert!(config.scan.timing);
    assert_eq!(config.output_mode(), OutputMode::DryRun);
}

#[test]
fn test_later_layers_win() {
    let temp_dir = tempdir().unwrap();
    let low = temp_dir.path().join("low.toml");
    let high = temp_dir.path().join("high.toml");
    fs::write(&low, "[scan]\nworkers = 2\nqueue_depth = 10\n").unwrap();
    fs::write(&high, "[scan]\nworkers = 6\n").unwrap();

    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&low))
        .merge(Toml::file(&high));
    let config = Config::from_figment(figment).unwrap();

    assert_eq!(config.scan.workers, 6);
    assert_eq!(config.scan.queue_depth, 10);
}

#[test]
fn test_config_invalid_value() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("sha3sum.toml");
    fs::write(&config_path, "[scan]\nconcurrency = \"sometimes\"\n").unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    assert!(Config::from_figment(figment).is_err());
}

#[test]
fn test_config_invalid_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("sha3sum.toml");
    fs::write(&config_path, "[scan\nworkers = ").unwrap();

    assert!(Config::load(Some(&config_path)).is_err());
}

#[test]
fn test_config_save_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("sha3sum.toml");

    let mut config = Config::default();
    config.scan.workers = 3;
    config.scan.ignore = vec!["*.log".to_string()];
    fs::write(&config_path, toml::to_string_pretty(&config).unwrap()).unwrap();

    let saved = fs::read_to_string(&config_path).unwrap();
    assert!(saved.contains("workers = 3"));
    assert!(saved.contains("concurrency = \"bounded\""));

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    assert_eq!(Config::from_figment(figment).unwrap(), config);
}
