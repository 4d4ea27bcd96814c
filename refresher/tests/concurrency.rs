//! Single-flight behaviour of `Refresher::load` under concurrent callers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use refresher::{Clock, ManualClock, Refresher};

const HOUR: Duration = Duration::from_secs(3600);

/// Number of concurrent callers, at least two so there is always a race.
fn callers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .max(2)
}

/// Runs `load` from `callers` threads released at the same instant.
fn load_concurrently<T, E, F, C>(
    refresher: &Refresher<T, E, F, C>,
    callers: usize,
) -> Vec<Result<T, E>>
where
    T: Clone + Send,
    E: Clone + Send,
    F: Fn() -> Result<T, E> + Sync,
    C: Clock,
    Refresher<T, E, F, C>: Sync,
{
    let barrier = Barrier::new(callers);
    thread::scope(|scope| {
        let handles: Vec<_> = (0..callers)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    refresher.load()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    })
}

#[test]
fn test_parallel_first_load() {
    let called = AtomicUsize::new(0);
    let refresher = Refresher::new(HOUR, || Ok::<_, ()>(called.fetch_add(1, Ordering::SeqCst) + 1));

    let results = load_concurrently(&refresher, callers());

    assert!(results.iter().all(|result| *result == Ok(1)));
    assert_eq!(called.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stale_while_refresh_parallel_first_load() {
    let called = AtomicUsize::new(0);
    let mut refresher = Refresher::new(HOUR, || {
        // Slow enough that every caller arrives while the first load runs.
        thread::sleep(Duration::from_millis(10));
        Ok::<_, ()>(called.fetch_add(1, Ordering::SeqCst) + 1)
    });
    refresher.set_stale_while_refresh(true);

    let results = load_concurrently(&refresher, callers());

    // Nothing stale exists yet, so everyone waits for the first value.
    assert!(results.iter().all(|result| *result == Ok(1)));
    assert_eq!(called.load(Ordering::SeqCst), 1);
}

#[test]
fn test_blocking_parallel_stale() {
    let clock = Arc::new(ManualClock::new());
    let called = AtomicUsize::new(0);
    let refresher = Refresher::with_clock(
        HOUR,
        || {
            let n = called.fetch_add(1, Ordering::SeqCst) + 1;
            if n > 1 {
                thread::sleep(Duration::from_millis(10));
            }
            Ok::<_, ()>(n)
        },
        Arc::clone(&clock),
    );

    assert_eq!(refresher.load(), Ok(1));
    clock.advance(HOUR * 2);

    let results = load_concurrently(&refresher, callers());

    // No caller is handed the stale value under the blocking policy.
    assert!(results.iter().all(|result| *result == Ok(2)));
    assert_eq!(called.load(Ordering::SeqCst), 2);
}

#[test]
fn test_blocking_parallel_failure_reaches_waiters() {
    let clock = Arc::new(ManualClock::new());
    let called = AtomicUsize::new(0);
    let refresher = Refresher::with_clock(
        HOUR,
        || {
            let n = called.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 1 {
                return Ok(n);
            }
            thread::sleep(Duration::from_millis(10));
            Err("upstream down")
        },
        Arc::clone(&clock),
    );

    assert_eq!(refresher.load(), Ok(1));
    clock.advance(HOUR * 2);

    let results = load_concurrently(&refresher, callers());

    assert!(results.iter().all(|result| *result == Err("upstream down")));
    assert_eq!(called.load(Ordering::SeqCst), 2);
}

#[test]
fn test_stale_while_refresh_parallel() {
    let callers = callers();
    let clock = Arc::new(ManualClock::new());
    let called = AtomicUsize::new(0);
    let saw_stale = AtomicUsize::new(0);

    let mut refresher = Refresher::with_clock(
        HOUR,
        || {
            let n = called.fetch_add(1, Ordering::SeqCst) + 1;
            if n > 1 {
                // Hold the refresh open until every other caller has left
                // with the stale value, so none of them can see the new one.
                let deadline = Instant::now() + Duration::from_secs(10);
                while saw_stale.load(Ordering::SeqCst) < callers - 1 && Instant::now() < deadline
                {
                    thread::sleep(Duration::from_millis(1));
                }
            }
            Ok::<_, ()>(n)
        },
        Arc::clone(&clock),
    );
    refresher.set_stale_while_refresh(true);

    assert_eq!(refresher.load(), Ok(1));
    clock.advance(HOUR * 2);

    let barrier = Barrier::new(callers);
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..callers)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    let result = refresher.load();
                    if result == Ok(1) {
                        saw_stale.fetch_add(1, Ordering::SeqCst);
                    }
                    result
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let fresh = results.iter().filter(|result| **result == Ok(2)).count();
    let stale = results.iter().filter(|result| **result == Ok(1)).count();
    assert_eq!(fresh, 1, "exactly one caller refreshes");
    assert_eq!(stale, callers - 1, "the rest must have seen stale data");
    assert_eq!(called.load(Ordering::SeqCst), 2);
}

#[test]
fn test_stale_while_refresh_loser_sees_previous_outcome() {
    let clock = Arc::new(ManualClock::new());
    let called = AtomicUsize::new(0);
    let loser_done = AtomicUsize::new(0);

    let mut refresher = Refresher::with_clock(
        HOUR,
        || {
            let n = called.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 1 {
                return Ok(n);
            }
            let deadline = Instant::now() + Duration::from_secs(10);
            while loser_done.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            Err("upstream down")
        },
        Arc::clone(&clock),
    );
    refresher.set_stale_while_refresh(true);

    assert_eq!(refresher.load(), Ok(1));
    clock.advance(HOUR * 2);

    let (winner, loser) = thread::scope(|scope| {
        let winner = scope.spawn(|| refresher.load());
        // Wait until the winner is inside compute before racing it.
        while called.load(Ordering::SeqCst) < 2 {
            thread::yield_now();
        }
        let loser = refresher.load();
        loser_done.fetch_add(1, Ordering::SeqCst);
        (winner.join().unwrap(), loser)
    });

    assert_eq!(winner, Err("upstream down"));
    assert_eq!(loser, Ok(1));
    // The failure is now cached for everyone.
    assert_eq!(refresher.load(), Err("upstream down"));
    assert_eq!(called.load(Ordering::SeqCst), 2);
}
