//! Time sources used to stamp and age snapshots.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Source of time for a [`Refresher`](crate::Refresher).
///
/// The refresher never reads the system time directly. Every timestamp it
/// records and every age it computes goes through this trait, so tests can
/// move time forward without sleeping.
///
/// Ages are measured with [`instant`](Self::instant) only. The wall clock
/// can be stepped (NTP, a manual change) and is used for reporting.
pub trait Clock: Send + Sync {
    /// Returns the current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns a monotonic reading. It never goes backwards.
    fn instant(&self) -> Instant;
}

impl<C> Clock for std::sync::Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> DateTime<Utc> {
        self.as_ref().now()
    }

    fn instant(&self) -> Instant {
        self.as_ref().instant()
    }
}

impl<C> Clock for &C
where
    C: Clock + ?Sized,
{
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn instant(&self) -> Instant {
        (**self).instant()
    }
}

/// Clock backed by [`Utc::now`] and [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    #[inline]
    fn instant(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock.
///
/// Time only moves when [`advance`](Self::advance) or [`set`](Self::set) is
/// called. Share it with the refresher through an `Arc` (or a reference) and
/// keep a handle in the test to drive it.
///
/// [`advance`](Self::advance) moves both readings, [`set`](Self::set) only
/// steps the wall clock, like an NTP correction would.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use refresher::{ManualClock, Refresher};
///
/// let clock = Arc::new(ManualClock::new());
/// let refresher = Refresher::with_clock(
///     Duration::from_secs(60),
///     || Ok::<_, ()>(42),
///     Arc::clone(&clock),
/// );
///
/// assert_eq!(refresher.load(), Ok(42));
/// clock.advance(Duration::from_secs(61));
/// assert!(refresher.is_stale());
/// ```
#[derive(Debug)]
pub struct ManualClock {
    readings: Mutex<Readings>,
}

#[derive(Debug, Clone, Copy)]
struct Readings {
    wall: DateTime<Utc>,
    instant: Instant,
}

impl ManualClock {
    /// Creates a clock frozen at the current system time.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Creates a clock frozen at `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            readings: Mutex::new(Readings {
                wall: now,
                instant: Instant::now(),
            }),
        }
    }

    /// Moves the clock forward by `delta`.
    ///
    /// The wall clock saturates at its maximum. The monotonic reading is
    /// left unchanged if `delta` does not fit in an [`Instant`].
    pub fn advance(&self, delta: Duration) {
        let wall_delta = chrono::Duration::from_std(delta).unwrap_or(chrono::Duration::MAX);
        let mut readings = self.lock();
        readings.wall = readings
            .wall
            .checked_add_signed(wall_delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        readings.instant = readings
            .instant
            .checked_add(delta)
            .unwrap_or(readings.instant);
    }

    /// Steps the wall clock to `now`. Moving backwards is allowed.
    ///
    /// Snapshot ages are unaffected.
    pub fn set(&self, now: DateTime<Utc>) {
        self.lock().wall = now;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Readings> {
        // The guarded value is plain data, a poisoned lock still holds a valid one.
        self.readings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().wall
    }

    fn instant(&self) -> Instant {
        self.lock().instant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let start = Utc::now();
        let clock = ManualClock::at(start);
        assert_eq!(clock.now(), start);

        let instant = clock.instant();

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now() - start, chrono::Duration::milliseconds(1500));
        assert_eq!(clock.instant() - instant, Duration::from_millis(1500));
    }

    #[test]
    fn test_manual_clock_set_backwards() {
        let start = Utc::now();
        let clock = ManualClock::at(start);
        let instant = clock.instant();

        clock.set(start - chrono::Duration::hours(1));
        assert_eq!(start - clock.now(), chrono::Duration::hours(1));
        assert_eq!(clock.instant(), instant);
    }

    #[test]
    fn test_manual_clock_saturates() {
        let clock = ManualClock::at(DateTime::<Utc>::MAX_UTC - chrono::Duration::seconds(1));
        clock.advance(Duration::from_secs(3600));
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);
    }
}
