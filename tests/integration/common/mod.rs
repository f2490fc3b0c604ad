#![allow(dead_code)]

use std::{
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::{Duration, Instant},
};

static TAG_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A name tag no other process on the host carries.
pub fn unique_tag(prefix: &str) -> String {
    let n = TAG_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}-{}-{n}", std::process::id())
}

/// Spawns a shell loop whose command line carries `tag` (as `$0`).
pub fn spawn_tagged_process(tag: &str) -> Child {
    Command::new("sh")
        .arg("-c")
        .arg("while :; do sleep 1; done")
        .arg(tag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn tagged process")
}

/// Kills and reaps a child spawned by a test.
pub fn stop(mut child: Child) {
    let _ = child.kill();
    let _ = child.wait();
}

pub fn wait_for_path(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !path.exists() {
        if Instant::now() >= deadline {
            panic!("Timed out waiting for {:?} to appear", path);
        }
        thread::sleep(Duration::from_millis(20));
    }
}

pub fn wait_for_exit(child: &mut Child) -> ExitStatus {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(status) = child.try_wait().expect("try_wait failed") {
            return status;
        }

        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            panic!("Timed out waiting for PID {} to exit", child.id());
        }

        thread::sleep(Duration::from_millis(20));
    }
}
