use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rusqlite::Connection;
use sha3sum::config::OutputMode;
use sha3sum::error::ExitCode;
use sha3sum::execute;
use sha3sum::scanner::hasher::{hash_bytes, hash_to_hex};
use tempfile::tempdir;

use super::common::{config_for, no_shutdown, Fixture};

fn rows(db: &std::path::Path) -> Vec<(String, String, i64)> {
    let conn = Connection::open(db).unwrap();
    let mut stmt = conn
        .prepare("SELECT path, sum, size FROM sha3sum ORDER BY path")
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn test_pool_mode_stores_every_entry() {
    let fixture = Fixture::new();
    let db_dir = tempdir().unwrap();
    let db = db_dir.path().join("sums.db");

    let config = config_for(fixture.root(), &db);
    let report = execute(&config, no_shutdown(), None, Vec::new()).unwrap();

    assert_eq!(report.mode, OutputMode::Pool);
    assert_eq!(report.exit_code(), ExitCode::Success);
    let stats = report.persisted.unwrap();
    assert_eq!(stats.stored, fixture.expected_entries());
    assert_eq!(stats.failed, 0);

    let rows = rows(&db);
    assert_eq!(rows.len(), fixture.expected_entries());

    let hello = hash_to_hex(&hash_bytes(b"hello"));
    let a = rows
        .iter()
        .find(|(p, _, _)| p.ends_with("a.txt"))
        .unwrap();
    assert_eq!(a.1, hello);
    assert_eq!(a.2, 5);

    let empty = rows
        .iter()
        .find(|(p, _, _)| p.ends_with("empty.txt"))
        .unwrap();
    assert_eq!(empty.1, hash_to_hex(&hash_bytes(b"")));
    assert_eq!(empty.2, 0);
}

#[test]
fn test_stream_mode_matches_pool_mode() {
    let fixture = Fixture::new();
    let db_dir = tempdir().unwrap();
    let pool_db = db_dir.path().join("pool.db");
    let stream_db = db_dir.path().join("stream.db");

    execute(&config_for(fixture.root(), &pool_db), no_shutdown(), None, Vec::new()).unwrap();

    let mut config = config_for(fixture.root(), &stream_db);
    config.scan.stream = true;
    config.scan.queue_depth = 1;
    let report = execute(&config, no_shutdown(), None, Vec::new()).unwrap();

    assert_eq!(report.mode, OutputMode::Stream);
    assert_eq!(report.persisted.unwrap().stored, fixture.expected_entries());
    assert_eq!(rows(&pool_db), rows(&stream_db));
}

#[test]
fn test_rejected_records_do_not_block_others() {
    let fixture = Fixture::new();
    let db_dir = tempdir().unwrap();
    let db = db_dir.path().join("strict.db");

    // Only empty files satisfy the constraint.
    Connection::open(&db)
        .unwrap()
        .execute(
            "CREATE TABLE sha3sum (
                id INTEGER PRIMARY KEY,
                path TEXT NOT NULL,
                size INTEGER NOT NULL CHECK (size < 1),
                sum TEXT NOT NULL,
                time TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )
        .unwrap();

    for stream in [false, true] {
        let mut config = config_for(fixture.root(), &db);
        config.scan.stream = stream;
        let report = execute(&config, no_shutdown(), None, Vec::new()).unwrap();

        let stats = report.persisted.as_ref().unwrap();
        assert_eq!(stats.attempted, fixture.expected_entries());
        assert_eq!(stats.stored, 1);
        assert_eq!(stats.failed, fixture.expected_entries() - 1);
        assert_eq!(report.exit_code(), ExitCode::Success);
    }

    let rows = rows(&db);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|(p, _, size)| p.ends_with("empty.txt") && *size == 0));
}

#[test]
fn test_runs_append_rows() {
    let fixture = Fixture::new();
    let db_dir = tempdir().unwrap();
    let db = db_dir.path().join("sums.db");
    let config = config_for(fixture.root(), &db);

    execute(&config, no_shutdown(), None, Vec::new()).unwrap();
    execute(&config, no_shutdown(), None, Vec::new()).unwrap();

    assert_eq!(rows(&db).len(), fixture.expected_entries() * 2);
}

#[test]
fn test_unusable_database_is_fatal() {
    let fixture = Fixture::new();
    let db_dir = tempdir().unwrap();
    let blocker = db_dir.path().join("file");
    fs::write(&blocker, b"x").unwrap();

    let config = config_for(fixture.root(), &blocker.join("sums.db"));
    assert!(execute(&config, no_shutdown(), None, Vec::new()).is_err());
}

#[test]
fn test_missing_root_creates_no_rows() {
    let db_dir = tempdir().unwrap();
    let db = db_dir.path().join("sums.db");
    let config = config_for(&db_dir.path().join("missing"), &db);

    assert!(execute(&config, no_shutdown(), None, Vec::new()).is_err());
    assert!(rows(&db).is_empty());
}

#[test]
fn test_interrupted_run_reports_interrupt() {
    let fixture = Fixture::new();
    let db_dir = tempdir().unwrap();
    let db = db_dir.path().join("sums.db");

    let report = execute(
        &config_for(fixture.root(), &db),
        Arc::new(AtomicBool::new(true)),
        None,
        Vec::new(),
    )
    .unwrap();

    assert!(report.walk.interrupted);
    assert_eq!(report.exit_code(), ExitCode::Interrupted);
    assert_eq!(report.persisted.unwrap().attempted, 0);
}
