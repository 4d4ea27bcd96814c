//! The [`Refresher`] type.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::builder::{NotSet, RefresherBuilder};
use crate::clock::{Clock, SystemClock};
use crate::config::RefresherConfig;
use crate::error::ConfigError;
use crate::flight::Mode;
use crate::metrics;
use crate::policy::RefreshPolicy;
use crate::snapshot::{Freshness, Snapshot};

/// Boxed compute function, for naming a refresher type in struct fields.
///
/// ```
/// use std::time::Duration;
/// use refresher::{BoxCompute, Refresher};
///
/// struct AppState {
///     motd: Refresher<String, String, BoxCompute<String, String>>,
/// }
///
/// let state = AppState {
///     motd: Refresher::new(
///         Duration::from_secs(30),
///         Box::new(|| Ok("hello".to_string())) as BoxCompute<_, _>,
///     ),
/// };
/// assert_eq!(state.motd.load().unwrap(), "hello");
/// ```
pub type BoxCompute<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;

/// Calls a function at most once every `max_age`, sharing its result between
/// all callers.
///
/// `compute` is not called until the first [`load`](Self::load). It always
/// runs on the thread of the `load` call that triggered it, the refresher
/// never spawns anything.
///
/// Share a refresher between threads by reference or through an `Arc`.
pub struct Refresher<T, E, F, C = SystemClock> {
    current: ArcSwap<Snapshot<T, E>>,
    max_age: Duration,
    policy: RefreshPolicy,
    label: SmolStr,
    compute: F,
    clock: C,
}

impl Refresher<NotSet, NotSet, NotSet> {
    /// Creates a new [`RefresherBuilder`].
    pub fn builder() -> RefresherBuilder<NotSet> {
        RefresherBuilder::new()
    }
}

impl<T, E, F> Refresher<T, E, F>
where
    F: Fn() -> Result<T, E>,
{
    /// Returns a refresher that calls `compute` at most once every `max_age`.
    ///
    /// # Panics
    ///
    /// Panics if `max_age` is zero. Use [`try_new`](Self::try_new) to get a
    /// [`ConfigError`] instead.
    pub fn new(max_age: Duration, compute: F) -> Self {
        Self::with_clock(max_age, compute, SystemClock)
    }

    /// Like [`new`](Self::new), but reports a zero `max_age` as an error.
    pub fn try_new(max_age: Duration, compute: F) -> Result<Self, ConfigError> {
        Self::from_parts(RefresherConfig::new(max_age), compute, SystemClock)
    }

    /// Builds a refresher from declarative settings.
    pub fn from_config(config: &RefresherConfig, compute: F) -> Result<Self, ConfigError> {
        Self::from_parts(config.clone(), compute, SystemClock)
    }
}

impl<T, E, F, C> Refresher<T, E, F, C>
where
    F: Fn() -> Result<T, E>,
    C: Clock,
{
    /// Like [`new`](Self::new), with an explicit time source.
    ///
    /// # Panics
    ///
    /// Panics if `max_age` is zero.
    pub fn with_clock(max_age: Duration, compute: F, clock: C) -> Self {
        match Self::from_parts(RefresherConfig::new(max_age), compute, clock) {
            Ok(refresher) => refresher,
            Err(err) => panic!("refresh: {err}"),
        }
    }

    pub(crate) fn from_parts(
        config: RefresherConfig,
        compute: F,
        clock: C,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            current: ArcSwap::from_pointee(Snapshot::unset()),
            max_age: config.max_age,
            policy: config.policy,
            label: config.label,
            compute,
            clock,
        })
    }

    /// Controls what [`load`](Self::load) does once the value is stale.
    ///
    /// When `true`, only one call to `load` recomputes while every concurrent
    /// call returns the stale result. When `false` (the default), every call
    /// blocks until a fresh result exists.
    ///
    /// Taking `&mut self` keeps this from racing with `load`: set the policy
    /// before sharing the refresher.
    pub fn set_stale_while_refresh(&mut self, enabled: bool) {
        self.policy = RefreshPolicy::from_stale_while_refresh(enabled);
    }

    /// Returns the configured staleness policy.
    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Returns how long a result stays fresh.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Returns the label used in log fields and metric labels.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// When the current result was published, `None` before the first load.
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.current.load().published()
    }

    /// Returns `true` if the next [`load`](Self::load) would recompute, or
    /// contend for recomputing, the value.
    pub fn is_stale(&self) -> bool {
        !matches!(
            self.current.load().freshness(self.clock.instant(), self.max_age),
            Freshness::Fresh(_)
        )
    }

    /// Returns a result that is at most `max_age` old.
    ///
    /// The only errors `load` returns are those returned by `compute`, and
    /// they are cached exactly like successes.
    ///
    /// Once the result is stale, the policy decides who waits:
    ///
    /// - [`RefreshPolicy::Block`]: every caller that saw the stale result
    ///   blocks while one of them recomputes, then all return the new result.
    /// - [`RefreshPolicy::StaleWhileRefresh`]: one caller recomputes and
    ///   returns the new result, the others return the stale one at once.
    ///
    /// The first ever call always blocks.
    pub fn load(&self) -> Result<T, E>
    where
        T: Clone,
        E: Clone,
    {
        let snapshot = self.current.load();
        match snapshot.freshness(self.clock.instant(), self.max_age) {
            Freshness::Fresh(outcome) => {
                trace!(refresher = %self.label, "fresh value");
                metrics::record_hit(&self.label);
                outcome.clone()
            }
            Freshness::Stale(outcome) if self.policy.is_stale_while_refresh() => {
                self.load_stale(&snapshot, outcome)
            }
            Freshness::Stale(_) | Freshness::Unset => self.load_fresh(&snapshot),
        }
    }

    fn load_fresh(&self, observed: &Snapshot<T, E>) -> Result<T, E>
    where
        T: Clone,
        E: Clone,
    {
        if let Some(outcome) = observed.flight().lead(Mode::Wait, || self.refresh()) {
            return outcome;
        }
        debug!(refresher = %self.label, "waited for concurrent refresh");
        metrics::record_wait(&self.label);

        let current = self.current.load();
        match current.outcome() {
            Some(outcome) => outcome.clone(),
            // The gate completed, so a computed snapshot has been published.
            None => self.load_fresh(&current),
        }
    }

    fn load_stale(&self, observed: &Snapshot<T, E>, stale: &Result<T, E>) -> Result<T, E>
    where
        T: Clone,
        E: Clone,
    {
        match observed.flight().lead(Mode::Skip, || self.refresh()) {
            Some(outcome) => outcome,
            None => {
                debug!(refresher = %self.label, "refresh in flight, returning stale value");
                metrics::record_stale(&self.label);
                stale.clone()
            }
        }
    }

    /// Calls `compute` and publishes its outcome as the current snapshot.
    fn refresh(&self) -> Result<T, E>
    where
        T: Clone,
        E: Clone,
    {
        debug!(refresher = %self.label, policy = self.policy.as_str(), "refreshing value");
        let started = Instant::now();
        let outcome = (self.compute)();
        let elapsed = started.elapsed();
        let failed = outcome.is_err();

        self.current.store(Arc::new(Snapshot::new(
            outcome.clone(),
            self.clock.now(),
            self.clock.instant(),
        )));

        debug!(refresher = %self.label, ?elapsed, failed, "published refreshed value");
        metrics::record_refresh(&self.label, elapsed, failed);
        outcome
    }
}

impl<T, E, F, C> std::fmt::Debug for Refresher<T, E, F, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher")
            .field("label", &self.label)
            .field("max_age", &self.max_age)
            .field("policy", &self.policy)
            .field("current", &self.current.load_full())
            .field("compute", &"...")
            .finish()
    }
}
