//! Builder for configuring a [`Refresher`].

use std::time::Duration;

use smol_str::SmolStr;

use crate::clock::{Clock, SystemClock};
use crate::config::RefresherConfig;
use crate::error::ConfigError;
use crate::policy::RefreshPolicy;
use crate::refresher::Refresher;

/// Marker type for unset builder fields.
///
/// This type is used in the typestate pattern for [`RefresherBuilder`].
/// When you see `NotSet` in a compiler error, it means you haven't called
/// the corresponding builder method yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotSet;

/// Builder for creating and configuring a [`Refresher`].
///
/// Use [`Refresher::builder`] to create a new builder instance. The max age is
/// required: `build()` only becomes available after
/// [`max_age()`](Self::max_age) has been called.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use refresher::{RefreshPolicy, Refresher};
///
/// let refresher = Refresher::builder()
///     .label("exchange-rates")
///     .max_age(Duration::from_secs(30 * 60))
///     .stale_while_refresh(true)
///     .build(|| Ok::<_, String>(vec![1.08_f64, 0.86]))
///     .unwrap();
///
/// assert_eq!(refresher.policy(), RefreshPolicy::StaleWhileRefresh);
/// assert_eq!(refresher.load().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RefresherBuilder<MaxAge, C = SystemClock> {
    max_age: MaxAge,
    policy: RefreshPolicy,
    label: Option<SmolStr>,
    clock: C,
}

impl RefresherBuilder<NotSet> {
    /// Creates a new builder with no max age, the blocking policy and the
    /// system clock.
    pub fn new() -> Self {
        Self {
            max_age: NotSet,
            policy: RefreshPolicy::default(),
            label: None,
            clock: SystemClock,
        }
    }
}

impl Default for RefresherBuilder<NotSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<MaxAge, C> RefresherBuilder<MaxAge, C> {
    /// Sets how long a computed result stays fresh.
    pub fn max_age(self, max_age: Duration) -> RefresherBuilder<Duration, C> {
        RefresherBuilder {
            max_age,
            policy: self.policy,
            label: self.label,
            clock: self.clock,
        }
    }

    /// Sets the staleness policy.
    pub fn policy(self, policy: RefreshPolicy) -> Self {
        Self { policy, ..self }
    }

    /// Shorthand for [`policy()`](Self::policy) with a boolean switch.
    pub fn stale_while_refresh(self, enabled: bool) -> Self {
        self.policy(RefreshPolicy::from_stale_while_refresh(enabled))
    }

    /// Sets the label reported in log fields and metric labels.
    pub fn label(self, label: impl Into<SmolStr>) -> Self {
        Self {
            label: Some(label.into()),
            ..self
        }
    }

    /// Replaces the time source.
    pub fn clock<NewC>(self, clock: NewC) -> RefresherBuilder<MaxAge, NewC>
    where
        NewC: Clock,
    {
        RefresherBuilder {
            max_age: self.max_age,
            policy: self.policy,
            label: self.label,
            clock,
        }
    }
}

impl<C> RefresherBuilder<Duration, C>
where
    C: Clock,
{
    /// Builds the [`Refresher`] around `compute`.
    ///
    /// Fails with [`ConfigError::NonPositiveMaxAge`] if the max age is zero.
    pub fn build<T, E, F>(self, compute: F) -> Result<Refresher<T, E, F, C>, ConfigError>
    where
        F: Fn() -> Result<T, E>,
    {
        let mut config = RefresherConfig::new(self.max_age);
        config.policy = self.policy;
        if let Some(label) = self.label {
            config.label = label;
        }
        Refresher::from_parts(config, compute, self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::clock::ManualClock;

    #[test]
    fn test_builder_defaults() {
        let refresher = Refresher::builder()
            .max_age(Duration::from_secs(5))
            .build(|| Ok::<_, ()>(1))
            .unwrap();

        assert_eq!(refresher.max_age(), Duration::from_secs(5));
        assert_eq!(refresher.policy(), RefreshPolicy::Block);
        assert_eq!(refresher.label(), crate::config::DEFAULT_LABEL);
    }

    #[test]
    fn test_builder_rejects_zero_max_age() {
        let result = Refresher::builder()
            .max_age(Duration::ZERO)
            .build(|| Ok::<_, ()>(1));
        assert_eq!(result.unwrap_err(), ConfigError::NonPositiveMaxAge);
    }

    #[test]
    fn test_builder_with_clock() {
        let clock = Arc::new(ManualClock::new());
        let refresher = RefresherBuilder::default()
            .clock(Arc::clone(&clock))
            .policy(RefreshPolicy::StaleWhileRefresh)
            .label("quotes")
            .max_age(Duration::from_secs(1))
            .build(|| Ok::<_, ()>("quote"))
            .unwrap();

        assert_eq!(refresher.label(), "quotes");
        assert_eq!(refresher.load(), Ok("quote"));
        assert_eq!(refresher.last_refreshed(), Some(clock.now()));
    }
}
