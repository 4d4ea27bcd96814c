//! Declarative refresher configuration.
//!
//! [`RefresherConfig`] can be deserialized from any serde format, durations
//! use the humantime notation (`"500ms"`, `"30s"`, `"15m"`):
//!
//! ```yaml
//! label: exchange-rates
//! max_age: 30m
//! policy: StaleWhileRefresh
//! ```
//!
//! Validation happens when the config is turned into a refresher with
//! [`Refresher::from_config`](crate::Refresher::from_config).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ConfigError;
use crate::policy::RefreshPolicy;

/// Label used when none is configured.
pub const DEFAULT_LABEL: &str = "default";

/// Serializable settings for a [`Refresher`](crate::Refresher).
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct RefresherConfig {
    /// Name reported in log fields and metric labels.
    #[serde(default = "default_label")]
    pub label: SmolStr,
    /// How long a computed result stays fresh (e.g., "5s", "500ms", "1m").
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
    /// What callers do once the result is stale.
    #[serde(default)]
    pub policy: RefreshPolicy,
}

fn default_label() -> SmolStr {
    SmolStr::new_static(DEFAULT_LABEL)
}

impl RefresherConfig {
    /// Creates a config with the given max age, blocking policy and default label.
    pub fn new(max_age: Duration) -> Self {
        Self {
            label: default_label(),
            max_age,
            policy: RefreshPolicy::default(),
        }
    }

    /// Checks the construction preconditions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_age.is_zero() {
            return Err(ConfigError::NonPositiveMaxAge);
        }
        Ok(())
    }
}
