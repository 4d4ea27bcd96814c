use serde::{Deserialize, Serialize};

/// Policy for handling a stale snapshot.
///
/// The very first load always blocks, whatever the policy, so no caller ever
/// sees a value that was never computed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
pub enum RefreshPolicy {
    /// Treat stale as expired: every caller that sees the stale snapshot waits
    /// for a single recomputation and returns its result.
    #[default]
    Block,
    /// One caller recomputes inside its own `load` call, every other caller
    /// returns the stale result immediately.
    StaleWhileRefresh,
}

impl RefreshPolicy {
    /// Maps the boolean "stale while refresh" switch to a policy.
    pub fn from_stale_while_refresh(enabled: bool) -> Self {
        if enabled {
            Self::StaleWhileRefresh
        } else {
            Self::Block
        }
    }

    /// Returns `true` for [`RefreshPolicy::StaleWhileRefresh`].
    pub fn is_stale_while_refresh(&self) -> bool {
        matches!(self, Self::StaleWhileRefresh)
    }

    /// Short name used in log fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::StaleWhileRefresh => "stale_while_refresh",
        }
    }
}
