//! Threads Example
//!
//! Shows both staleness policies with plain OS threads: a burst of readers
//! hits a stale refresher, and we count who waited and who got stale data.
//!
//! Run:
//!   cargo run -p refresher-demos --example threads

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use refresher::{ManualClock, RefreshPolicy, Refresher};

const READERS: usize = 8;

fn burst(policy: RefreshPolicy) {
    let clock = Arc::new(ManualClock::new());
    let computed = AtomicU64::new(0);
    let refresher = Refresher::builder()
        .label(policy.as_str())
        .max_age(Duration::from_secs(60))
        .policy(policy)
        .clock(Arc::clone(&clock))
        .build(|| {
            thread::sleep(Duration::from_millis(200));
            Ok::<_, String>(computed.fetch_add(1, Ordering::SeqCst) + 1)
        })
        .unwrap();

    refresher.load().unwrap();
    clock.advance(Duration::from_secs(61));

    let barrier = Barrier::new(READERS);
    thread::scope(|scope| {
        for reader in 0..READERS {
            let refresher = &refresher;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                let started = Instant::now();
                let value = refresher.load().unwrap();
                tracing::info!(
                    policy = policy.as_str(),
                    reader,
                    value,
                    waited = ?started.elapsed(),
                    "load returned"
                );
            });
        }
    });

    tracing::info!(
        policy = policy.as_str(),
        computed = computed.load(Ordering::SeqCst),
        "burst done"
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("info,refresher=debug")
        .init();

    burst(RefreshPolicy::Block);
    burst(RefreshPolicy::StaleWhileRefresh);
}
