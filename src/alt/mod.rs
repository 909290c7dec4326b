// src/alt/mod.rs

//! Selective wait over multiple events.
//!
//! An [`Alternative`] waits for the first of several [`Guard`]s to become
//! ready and returns its index. Selection runs a two-phase protocol:
//!
//! 1. **Enable**, in scan order: each guard either reports itself ready
//!    (which short-circuits the phase) or registers the alternative's signal
//!    so the event can wake it later.
//! 2. If nothing was ready, the selecting thread parks on the signal until a
//!    writer deposits on a registered channel, poison arrives, a barrier
//!    completes, or the earliest timeout-guard deadline passes.
//! 3. **Disable**, in reverse scan order: registrations are withdrawn and
//!    each guard re-reports readiness. The ready guard nearest the scan start
//!    is the one selected.
//!
//! The scan start is what distinguishes the three policies: [`pri_select`]
//! always scans from index 0, [`fair_select`] scans from just past the
//! previous selection, and [`select`] scans from a uniformly random index so
//! that no guard can be starved under sustained load.
//!
//! [`select`]: Alternative::select
//! [`pri_select`]: Alternative::pri_select
//! [`fair_select`]: Alternative::fair_select

pub mod barrier;
mod guard;
mod signal;

pub use guard::{Guard, SkipGuard, TimeoutGuard};
pub use signal::AltSignal;

use std::fmt;
use std::sync::Arc;

use rand::Rng;

use crate::telemetry::WakeupObserver;

/// A selective wait over an ordered set of guards.
///
/// The guard vector is fixed for the lifetime of the alternative, but the
/// alternative itself is reusable: a server loop typically constructs one and
/// calls a `*select` method each iteration. It must not be shared between
/// threads mid-selection (it is `!Sync` by construction of its methods taking
/// `&mut self`).
pub struct Alternative<'a> {
  guards: Vec<&'a dyn Guard>,
  signal: Arc<AltSignal>,
  /// One past the index chosen by the previous `fair_select`.
  favourite: usize,
  observer: Option<Arc<dyn WakeupObserver>>,
}

impl fmt::Debug for Alternative<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Alternative")
      .field("guards", &self.guards.len())
      .field("favourite", &self.favourite)
      .finish()
  }
}

impl<'a> Alternative<'a> {
  /// Creates an alternative over `guards`.
  ///
  /// # Panics
  ///
  /// Panics if `guards` is empty.
  pub fn new(guards: Vec<&'a dyn Guard>) -> Self {
    assert!(!guards.is_empty(), "Alternative requires at least one guard");
    Alternative {
      guards,
      signal: Arc::new(AltSignal::new()),
      favourite: 0,
      observer: None,
    }
  }

  /// As [`new`](Alternative::new), with an observer that is told about
  /// re-entered wait loops.
  pub fn with_observer(guards: Vec<&'a dyn Guard>, observer: Arc<dyn WakeupObserver>) -> Self {
    let mut alt = Self::new(guards);
    alt.observer = Some(observer);
    alt
  }

  /// Waits for a ready guard, choosing arbitrarily among ready ones.
  ///
  /// "Arbitrarily" is a uniformly random scan rotation, so under sustained
  /// load every ready guard is selected with equal probability and none can
  /// be starved.
  pub fn select(&mut self) -> usize {
    let start = rand::rng().random_range(0..self.guards.len());
    self.do_select(start, None)
  }

  /// Waits for a ready guard, choosing the lowest-indexed ready one.
  pub fn pri_select(&mut self) -> usize {
    self.do_select(0, None)
  }

  /// Waits for a ready guard, choosing the first ready one strictly after
  /// the previously chosen index (cyclically). Over repeated calls every
  /// continuously-ready guard is chosen in turn.
  pub fn fair_select(&mut self) -> usize {
    let start = self.favourite % self.guards.len();
    let chosen = self.do_select(start, None);
    self.favourite = (chosen + 1) % self.guards.len();
    chosen
  }

  /// [`select`](Alternative::select) restricted to guards whose precondition
  /// is true.
  pub fn select_pre(&mut self, preconditions: &[bool]) -> usize {
    let start = rand::rng().random_range(0..self.guards.len());
    self.do_select(start, Some(preconditions))
  }

  /// [`pri_select`](Alternative::pri_select) restricted to guards whose
  /// precondition is true.
  pub fn pri_select_pre(&mut self, preconditions: &[bool]) -> usize {
    self.do_select(0, Some(preconditions))
  }

  /// [`fair_select`](Alternative::fair_select) restricted to guards whose
  /// precondition is true.
  pub fn fair_select_pre(&mut self, preconditions: &[bool]) -> usize {
    let start = self.favourite % self.guards.len();
    let chosen = self.do_select(start, Some(preconditions));
    self.favourite = (chosen + 1) % self.guards.len();
    chosen
  }

  /// The selection engine. `start` is the scan origin; offsets are scan
  /// positions relative to it, wrapping over the guard vector.
  fn do_select(&mut self, start: usize, preconditions: Option<&[bool]>) -> usize {
    let n = self.guards.len();
    if let Some(pre) = preconditions {
      assert_eq!(pre.len(), n, "precondition vector length must match guard count");
      assert!(
        pre.iter().any(|&p| p),
        "selection requires at least one true precondition"
      );
    }
    let active = |index: usize| preconditions.map_or(true, |pre| pre[index]);

    loop {
      self.signal.begin_enable();

      // Enable phase: stop at the first ready guard.
      let mut enabled: Vec<usize> = Vec::with_capacity(n);
      let mut selected: Option<usize> = None;
      for offset in 0..n {
        let index = (start + offset) % n;
        if !active(index) {
          continue;
        }
        if self.guards[index].enable(&self.signal) {
          selected = Some(offset);
          break;
        }
        enabled.push(offset);
      }

      if selected.is_none() {
        self.signal.wait(self.observer.as_deref());
      }

      // Disable phase, in reverse: the ready guard nearest the scan start
      // ends up selected.
      for &offset in enabled.iter().rev() {
        let index = (start + offset) % n;
        if self.guards[index].disable() {
          selected = Some(offset);
        }
      }
      self.signal.finish();

      if let Some(offset) = selected {
        return (start + offset) % n;
      }
      // Scheduled but nothing ready any more; run the protocol again.
    }
  }
}
