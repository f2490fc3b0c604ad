//! Integration tests running the single-instance check against the live process table.

#[path = "common/mod.rs"]
mod common;

use std::{
    thread,
    time::{Duration, Instant},
};

use common::{spawn_tagged_process, stop, unique_tag};
use procguard::{
    InstanceGuard, check_single_instance,
    instance::{ProcessTable, SystemProcessTable},
};

#[test]
fn unmatched_tag_is_safe_to_proceed() {
    let tag = unique_tag("procguard-nobody");
    assert!(check_single_instance(&tag));
}

#[test]
fn own_process_is_not_a_duplicate() {
    let exe = std::env::current_exe().expect("current exe");
    let name = exe
        .file_name()
        .expect("exe file name")
        .to_string_lossy()
        .into_owned();

    let guard = InstanceGuard::new(name);
    assert!(guard.find_duplicates(&SystemProcessTable).unwrap().is_empty());
    assert!(guard.check(&SystemProcessTable));
}

#[test]
fn second_process_with_tag_is_detected() {
    let tag = unique_tag("procguard-dup");
    let child = spawn_tagged_process(&tag);
    let child_pid = child.id();

    let guard = InstanceGuard::new(tag.as_str());
    let deadline = Instant::now() + Duration::from_secs(5);
    let duplicates = loop {
        let found = guard.find_duplicates(&SystemProcessTable).unwrap();
        if found.contains(&child_pid) || Instant::now() >= deadline {
            break found;
        }
        thread::sleep(Duration::from_millis(50));
    };
    let detected = check_single_instance(&tag);
    stop(child);

    assert!(duplicates.contains(&child_pid), "{duplicates:?}");
    assert!(!detected);
    assert!(check_single_instance(&tag));
}

#[test]
fn snapshot_excludes_threads() {
    let entries = SystemProcessTable.snapshot().unwrap();
    let own = std::process::id();
    assert_eq!(entries.iter().filter(|entry| entry.pid == own).count(), 1);
}
