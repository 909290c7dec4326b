// src/alt/guard.rs

//! Events an [`Alternative`](crate::alt::Alternative) can wait upon.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::signal::AltSignal;

/// An event that can take part in a selective wait.
///
/// The two methods are the halves of the alternative's two-phase protocol:
/// `enable` either reports the event ready or registers the signal to be
/// scheduled when it becomes so; `disable` withdraws the registration and
/// reports whether the event is ready *now*. The built-in guards are channel
/// read ends ([`ChannelIn`](crate::channel::ChannelIn)), [`TimeoutGuard`],
/// [`SkipGuard`] and [`AltingBarrier`](crate::alt::barrier::AltingBarrier).
///
/// The signal type is opaque, so guards implemented outside this crate can
/// only ever be unconditionally ready or unready.
pub trait Guard {
  /// First phase: report readiness, or register `signal` for a later wakeup.
  fn enable(&self, signal: &Arc<AltSignal>) -> bool;

  /// Second phase: withdraw the registration, reporting current readiness.
  fn disable(&self) -> bool;
}

/// A guard that is always ready. Selecting over one turns a blocking wait
/// into a poll: if nothing else is ready, the skip is chosen.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipGuard;

impl SkipGuard {
  /// Creates a skip guard.
  pub fn new() -> Self {
    SkipGuard
  }
}

impl Guard for SkipGuard {
  fn enable(&self, _signal: &Arc<AltSignal>) -> bool {
    true
  }

  fn disable(&self) -> bool {
    true
  }
}

/// A guard that becomes ready once a deadline has passed.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuard {
  deadline: Instant,
}

impl TimeoutGuard {
  /// A guard ready at `deadline`.
  pub fn at(deadline: Instant) -> Self {
    TimeoutGuard { deadline }
  }

  /// A guard ready `timeout` from now.
  pub fn after(timeout: Duration) -> Self {
    TimeoutGuard { deadline: Instant::now() + timeout }
  }

  /// The absolute deadline.
  pub fn deadline(&self) -> Instant {
    self.deadline
  }
}

impl Guard for TimeoutGuard {
  fn enable(&self, signal: &Arc<AltSignal>) -> bool {
    if Instant::now() >= self.deadline {
      true
    } else {
      signal.set_deadline(self.deadline);
      false
    }
  }

  fn disable(&self) -> bool {
    Instant::now() >= self.deadline
  }
}
