// src/telemetry.rs

//! Observation hooks for wait-loop diagnostics.
//!
//! Every blocking wait in the kernel is loop-guarded. A wakeup that finds its
//! predicate still unsatisfied is re-parked, and the loop re-entry is reported
//! here. An observer is attached per channel at construction time through
//! [`Channel::observer`](crate::channel::Channel::observer); without one the
//! kernel only emits `log::trace!` records, which cost nothing unless a logger
//! is installed.

/// Where in the kernel a wait loop was re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitSite {
  /// A reader waiting for data.
  Read,
  /// A writer waiting for its value to be taken, or for buffer space.
  Write,
  /// An alternative waiting for a guard to become ready.
  Alt,
}

/// Callback invoked when a blocked party wakes up and has to wait again.
pub trait WakeupObserver: Send + Sync {
  /// Called with the site whose wait loop went around once more.
  fn spurious_wakeup(&self, site: WaitSite);
}
