//! Immutable record of one computation.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::flight::Flight;

/// What a reader learns from looking at a snapshot at a given instant.
#[derive(Debug)]
pub(crate) enum Freshness<'a, T, E> {
    /// Nothing has been computed yet.
    Unset,
    /// Computed no longer than `max_age` ago.
    Fresh(&'a Result<T, E>),
    /// Computed more than `max_age` ago.
    Stale(&'a Result<T, E>),
}

struct Entry<T, E> {
    outcome: Result<T, E>,
    published: DateTime<Utc>,
    stamped: Instant,
}

/// The cached outcome of the compute function plus the gate that elects
/// whoever replaces it.
///
/// Only the gate is ever touched after publication.
pub(crate) struct Snapshot<T, E> {
    entry: Option<Entry<T, E>>,
    flight: Flight,
}

impl<T, E> Snapshot<T, E> {
    /// The "never computed" placeholder a refresher starts with.
    pub(crate) const fn unset() -> Self {
        Self {
            entry: None,
            flight: Flight::new(),
        }
    }

    /// `published` is reported to callers, `stamped` is what the snapshot
    /// ages from.
    pub(crate) fn new(outcome: Result<T, E>, published: DateTime<Utc>, stamped: Instant) -> Self {
        Self {
            entry: Some(Entry {
                outcome,
                published,
                stamped,
            }),
            flight: Flight::new(),
        }
    }

    pub(crate) fn flight(&self) -> &Flight {
        &self.flight
    }

    pub(crate) fn outcome(&self) -> Option<&Result<T, E>> {
        self.entry.as_ref().map(|entry| &entry.outcome)
    }

    pub(crate) fn published(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref().map(|entry| entry.published)
    }

    /// Classifies the snapshot at `now`.
    ///
    /// The boundary is inclusive: a snapshot exactly `max_age` old is fresh.
    pub(crate) fn freshness(&self, now: Instant, max_age: Duration) -> Freshness<'_, T, E> {
        let Some(entry) = &self.entry else {
            return Freshness::Unset;
        };
        if now.saturating_duration_since(entry.stamped) > max_age {
            Freshness::Stale(&entry.outcome)
        } else {
            Freshness::Fresh(&entry.outcome)
        }
    }
}

impl<T, E> fmt::Debug for Snapshot<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("published", &self.published())
            .field("failed", &self.outcome().map(Result::is_err))
            .field("flight", &self.flight)
            .finish()
    }
}
