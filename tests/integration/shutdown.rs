//! Integration tests delivering real signals to the test process.
//!
//! Everything lives in a single test so no other test observes (or races with) the
//! signals raised here.

use std::{
    thread,
    time::{Duration, Instant},
};

use nix::sys::signal::{Signal, raise};
use procguard::{ShutdownSignal, ShutdownState};

fn wait_until_requested(signal: &ShutdownSignal) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !signal.requested() {
        if Instant::now() >= deadline {
            panic!("Timed out waiting for the shutdown flag");
        }
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn termination_signals_flip_the_flag_without_killing_the_process() {
    let first = ShutdownSignal::install().expect("install handlers");
    let second = ShutdownSignal::install().expect("handlers can be installed twice");
    let worker_view = first.handle();

    assert!(!first.requested());
    assert_eq!(first.state(), ShutdownState::Running);

    raise(Signal::SIGTERM).expect("raise SIGTERM");
    wait_until_requested(&first);
    wait_until_requested(&second);
    assert!(worker_view.requested());

    // A second signal of the other kind is absorbed by the same transition.
    raise(Signal::SIGINT).expect("raise SIGINT");
    raise(Signal::SIGTERM).expect("raise SIGTERM again");

    for _ in 0..5 {
        assert!(first.requested());
        assert_eq!(first.state(), ShutdownState::ShutdownRequested);
        thread::sleep(Duration::from_millis(10));
    }

    let late = ShutdownSignal::install().expect("install after shutdown");
    assert!(!late.requested());
    raise(Signal::SIGINT).expect("raise SIGINT");
    wait_until_requested(&late);
}
