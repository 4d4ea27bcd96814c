//! Metrics declaration and recording.
//!
//! With the `metrics` feature enabled every [`Refresher`](crate::Refresher)
//! reports through the [`metrics`](https://docs.rs/metrics) facade, labelled
//! with its configured label. Without the feature the recording functions are
//! empty and compile away.

use std::time::Duration;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of loads answered from a fresh snapshot.
    pub static ref REFRESHER_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "refresher_hit_total",
            "Total number of loads answered from a fresh snapshot."
        );
        "refresher_hit_total"
    };
    /// Track number of loads answered with stale data while another caller refreshed.
    pub static ref REFRESHER_STALE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "refresher_stale_total",
            "Total number of loads answered with stale data during a refresh."
        );
        "refresher_stale_total"
    };
    /// Track number of loads that waited for another caller's refresh.
    pub static ref REFRESHER_WAIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "refresher_wait_total",
            "Total number of loads that blocked on a concurrent refresh."
        );
        "refresher_wait_total"
    };
    /// Track number of compute function invocations.
    pub static ref REFRESHER_REFRESH_COUNTER: &'static str = {
        metrics::describe_counter!(
            "refresher_refresh_total",
            "Total number of compute function invocations."
        );
        "refresher_refresh_total"
    };
    /// Histogram of compute function duration.
    pub static ref REFRESHER_REFRESH_DURATION: &'static str = {
        metrics::describe_histogram!(
            "refresher_refresh_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of compute function invocations in seconds."
        );
        "refresher_refresh_duration_seconds"
    };
}

/// Record a load served from a fresh snapshot.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_hit(label: &str) {
    metrics::counter!(*REFRESHER_HIT_COUNTER, "refresher" => label.to_string()).increment(1);
}

/// Record a load that returned stale data because another caller held the refresh.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_stale(label: &str) {
    metrics::counter!(*REFRESHER_STALE_COUNTER, "refresher" => label.to_string()).increment(1);
}

/// Record a load that blocked until another caller finished refreshing.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_wait(label: &str) {
    metrics::counter!(*REFRESHER_WAIT_COUNTER, "refresher" => label.to_string()).increment(1);
}

/// Record one compute invocation, its duration and whether it failed.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_refresh(label: &str, duration: Duration, failed: bool) {
    let outcome = if failed { "error" } else { "ok" };
    metrics::counter!(
        *REFRESHER_REFRESH_COUNTER,
        "refresher" => label.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        *REFRESHER_REFRESH_DURATION,
        "refresher" => label.to_string(),
        "outcome" => outcome
    )
    .record(duration.as_secs_f64());
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_hit(_label: &str) {}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_stale(_label: &str) {}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_wait(_label: &str) {}

/// No-op version when metrics feature is disabled.
/// The compiler will eliminate this empty function call.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_refresh(_label: &str, _duration: Duration, _failed: bool) {}
