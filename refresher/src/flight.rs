//! Single-flight gate attached to every snapshot.
//!
//! A [`Flight`] lets exactly one caller run a unit of work. What the other
//! callers do is decided by the [`Mode`] they enter with:
//!
//! - [`Mode::Wait`] parks them until the leader finishes,
//! - [`Mode::Skip`] sends them away immediately.
//!
//! Each mode can elect its leader once per gate. A fresh gate is created for
//! every published snapshot, so "once" means once per staleness episode.

use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

/// How non-leading callers behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Block until the leader's work has completed.
    Wait,
    /// Return immediately without running anything.
    Skip,
}

#[derive(Debug)]
pub(crate) struct Flight {
    done: Once,
    claimed: AtomicBool,
}

impl Flight {
    pub(crate) const fn new() -> Self {
        Self {
            done: Once::new(),
            claimed: AtomicBool::new(false),
        }
    }

    /// Runs `work` if this caller becomes the leader.
    ///
    /// Returns `Some` with the work's output for the leader and `None` for
    /// everyone else. In [`Mode::Wait`] a `None` is only returned after the
    /// leader's work has finished.
    ///
    /// If the leader panics the gate is re-armed: in `Wait` mode one of the
    /// parked callers takes over, in `Skip` mode the next caller may claim.
    pub(crate) fn lead<R>(&self, mode: Mode, work: impl FnOnce() -> R) -> Option<R> {
        match mode {
            Mode::Wait => {
                let mut output = None;
                self.done.call_once_force(|_| output = Some(work()));
                output
            }
            Mode::Skip => {
                if self
                    .claimed
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    return None;
                }
                let claim = Claim {
                    flag: &self.claimed,
                    settled: false,
                };
                let output = work();
                claim.settle();
                Some(output)
            }
        }
    }

    /// Returns `true` once a leader holds or has held the gate in either mode.
    #[cfg(test)]
    pub(crate) fn is_taken(&self) -> bool {
        self.done.is_completed() || self.claimed.load(Ordering::Acquire)
    }
}

/// Releases a `Skip` claim if the leader unwinds before settling it.
struct Claim<'a> {
    flag: &'a AtomicBool,
    settled: bool,
}

impl Claim<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.flag.store(false, Ordering::Release);
        }
    }
}
