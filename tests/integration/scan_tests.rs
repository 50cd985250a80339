use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use sha3sum::pool::ResultPool;
use sha3sum::scanner::hasher::hash_bytes;
use sha3sum::scanner::{Concurrency, ScanError, Walker, WalkerConfig};
use tempfile::tempdir;

use super::common::Fixture;

fn policies() -> Vec<Concurrency> {
    vec![
        Concurrency::Inline,
        Concurrency::Bounded {
            workers: 1,
            queue_depth: 1,
        },
        Concurrency::Bounded {
            workers: 4,
            queue_depth: 2,
        },
        Concurrency::default(),
        Concurrency::Unbounded,
    ]
}

#[test]
fn test_example_tree_under_every_policy() {
    let fixture = Fixture::new();

    for policy in policies() {
        let pool = ResultPool::new();
        let walker = Walker::new(
            fixture.root(),
            WalkerConfig::default().with_concurrency(policy),
        );
        let summary = walker.run(&pool).unwrap();

        assert_eq!(pool.len(), fixture.expected_entries(), "policy {policy:?}");

        let a = pool.get(&fixture.path("a.txt")).unwrap();
        let b = pool.get(&fixture.path("sub/b.txt")).unwrap();
        let empty = pool.get(&fixture.path("sub/empty.txt")).unwrap();

        assert_eq!(a.digest, b.digest);
        assert_eq!(a.digest, hash_bytes(b"hello"));
        assert_eq!(a.size, 5);
        assert_eq!(empty.size, 0);
        assert_eq!(empty.digest, hash_bytes(b""));

        if fixture.locked_unreadable {
            assert!(!pool.contains(&fixture.path("sub/locked")));
            assert_eq!(summary.hash_errors, 1);
        }
        assert_eq!(summary.files_seen, 4);
        assert_eq!(summary.files_hashed, fixture.expected_entries());
        assert!(!summary.interrupted);
    }
}

#[test]
fn test_every_file_appears_exactly_once() {
    let dir = tempdir().unwrap();
    for d in 0..5 {
        let sub = dir.path().join(format!("d{d}"));
        fs::create_dir(&sub).unwrap();
        for f in 0..40 {
            fs::write(sub.join(format!("f{f}")), format!("{d}-{f}")).unwrap();
        }
    }

    for policy in policies() {
        let pool = ResultPool::new();
        Walker::new(dir.path(), WalkerConfig::default().with_concurrency(policy))
            .run(&pool)
            .unwrap();

        assert_eq!(pool.len(), 200, "policy {policy:?}");
        let mut total = 0;
        pool.for_each(|entry| {
            let content = fs::read(&entry.path).unwrap();
            assert_eq!(entry.digest, hash_bytes(&content));
            assert_eq!(entry.size, content.len() as u64);
            total += 1;
        });
        assert_eq!(total, 200);
    }
}

#[test]
fn test_large_file_streams_through_buffer() {
    let dir = tempdir().unwrap();
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(dir.path().join("big.bin"), &content).unwrap();

    let pool = ResultPool::new();
    Walker::new(dir.path(), WalkerConfig::default())
        .run(&pool)
        .unwrap();

    let entry = pool.get(&dir.path().join("big.bin")).unwrap();
    assert_eq!(entry.size, 300_000);
    assert_eq!(entry.digest, hash_bytes(&content));
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let pool = ResultPool::new();

    let result = Walker::new(&dir.path().join("missing"), WalkerConfig::default()).run(&pool);

    assert!(matches!(result, Err(ScanError::NotFound(_))));
    assert!(pool.is_empty());
}

#[test]
fn test_file_root_yields_single_entry() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("one.txt");
    fs::write(&file, b"x").unwrap();

    let pool = ResultPool::new();
    let summary = Walker::new(&file, WalkerConfig::default())
        .run(&pool)
        .unwrap();

    assert_eq!(summary.files_hashed, 1);
    assert_eq!(pool.len(), 1);
    let entry = pool.get(&file).unwrap();
    assert_eq!(entry.size, 1);
    assert_eq!(entry.digest, hash_bytes(b"x"));
}

#[test]
fn test_shutdown_before_start_dispatches_nothing() {
    let fixture = Fixture::new();
    let pool = ResultPool::new();

    let summary = Walker::new(fixture.root(), WalkerConfig::default())
        .with_shutdown_flag(Arc::new(AtomicBool::new(true)))
        .run(&pool)
        .unwrap();

    assert!(summary.interrupted);
    assert!(pool.is_empty());
}

#[test]
fn test_ignore_and_hidden_filters() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), b"k").unwrap();
    fs::write(dir.path().join("drop.tmp"), b"d").unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join(".git/HEAD"), b"ref").unwrap();

    let pool = ResultPool::new();
    let config = WalkerConfig::default()
        .with_skip_hidden(true)
        .with_ignore_patterns(vec!["*.tmp".to_string()]);
    Walker::new(dir.path(), config).run(&pool).unwrap();

    assert_eq!(pool.len(), 1);
    assert!(pool.contains(&dir.path().join("keep.txt")));
    assert!(!pool.contains(&dir.path().join(".git/HEAD")));
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("ok.txt"), b"ok").unwrap();
    let closed = dir.path().join("closed");
    fs::create_dir(&closed).unwrap();
    fs::write(closed.join("inner.txt"), b"inner").unwrap();
    fs::set_permissions(&closed, fs::Permissions::from_mode(0o000)).unwrap();
    let enforced = fs::read_dir(&closed).is_err();

    let pool = ResultPool::new();
    let summary = Walker::new(dir.path(), WalkerConfig::default())
        .run(&pool)
        .unwrap();

    // Restore so the temp dir can be cleaned up.
    fs::set_permissions(&closed, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(pool.contains(&dir.path().join("ok.txt")));
    if enforced {
        assert_eq!(pool.len(), 1);
        assert_eq!(summary.walk_errors, 1);
    } else {
        assert_eq!(pool.len(), 2);
    }
}
