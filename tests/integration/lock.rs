//! Integration tests covering the advisory lock-file contract end to end.

use std::{
    fs,
    sync::{Arc, Barrier},
    thread,
};

use procguard::{
    LockError, LockFile,
    lock::{self, marker_path},
};
use tempfile::tempdir;

#[test]
fn acquire_conflict_release_scenario() {
    let temp = tempdir().expect("failed to create temp dir");
    let target = temp.path().join("job");
    let marker = temp.path().join("job.lock");
    assert!(!marker.exists());

    let mine = LockFile::new(&target);
    mine.acquire().expect("first acquire should succeed");
    assert_eq!(
        fs::read_to_string(&marker).unwrap(),
        std::process::id().to_string()
    );

    let theirs = LockFile::new(&target).with_owner("31337");
    match theirs.acquire() {
        Err(LockError::AlreadyLocked { path, .. }) => assert_eq!(path, marker),
        other => panic!("expected AlreadyLocked, got {other:?}"),
    }
    assert_eq!(
        fs::read_to_string(&marker).unwrap(),
        std::process::id().to_string()
    );

    mine.release().expect("release should succeed");
    assert!(!marker.exists());
    assert!(!lock::is_locked(&target));
}

#[test]
fn exclusive_acquire_has_exactly_one_winner() {
    const CONTENDERS: usize = 8;

    let temp = tempdir().expect("failed to create temp dir");
    let target = Arc::new(temp.path().join("shared"));
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|n| {
            let target = Arc::clone(&target);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let lock = LockFile::new(target.as_path()).with_owner(format!("worker-{n}"));
                barrier.wait();
                lock.acquire_exclusive().is_ok()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);

    let owner = fs::read_to_string(marker_path(&target)).unwrap();
    assert!(owner.starts_with("worker-"), "unexpected owner {owner:?}");
}

#[test]
fn guard_scope_bounds_the_claim() {
    let temp = tempdir().expect("failed to create temp dir");
    let target = temp.path().join("report.csv");

    {
        let guard = LockFile::new(&target)
            .with_owner("exporter")
            .acquire_guard()
            .expect("acquire guard");
        assert_eq!(
            guard.lock().owner().unwrap().as_deref(),
            Some("exporter")
        );
        assert!(lock::is_locked(&target));
    }

    assert!(!lock::is_locked(&target));
}

#[test]
fn stale_marker_blocks_until_released() {
    let temp = tempdir().expect("failed to create temp dir");
    let target = temp.path().join("job");
    fs::write(marker_path(&target), "999999").unwrap();

    assert!(matches!(
        lock::acquire(&target),
        Err(LockError::AlreadyLocked { owner: Some(ref owner), .. }) if owner == "999999"
    ));

    lock::release(&target).unwrap();
    lock::acquire_as(&target, "fresh").unwrap();
    assert_eq!(fs::read_to_string(marker_path(&target)).unwrap(), "fresh");
}
