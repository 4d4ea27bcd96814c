#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Typestate builder for [`Refresher`].
pub mod builder;

/// Time sources.
///
/// A [`Refresher`] reads time only through the [`Clock`] trait.
/// [`SystemClock`] is the default, [`ManualClock`] lets tests move time
/// forward without sleeping.
pub mod clock;

pub mod config;

/// Construction errors.
pub mod error;

mod flight;

/// Metrics collection for refresher observability.
///
/// When the `metrics` feature is enabled, this module provides counters
/// and histograms for:
/// - Loads served fresh, served stale, or parked behind a refresh
/// - Compute invocations and their duration, split by outcome
pub mod metrics;

/// Policy for stale snapshots.
///
/// Defines [`RefreshPolicy`] with:
/// - **Block**: everyone waits for one recomputation
/// - **StaleWhileRefresh**: one caller recomputes, the rest get stale data
pub mod policy;

mod refresher;
mod snapshot;

pub use builder::{NotSet, RefresherBuilder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RefresherConfig;
pub use error::ConfigError;
pub use policy::RefreshPolicy;
pub use refresher::{BoxCompute, Refresher};

/// The `refresher` prelude.
///
/// ```rust
/// use refresher::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Clock, RefreshPolicy, Refresher, RefresherConfig};
}
