// src/alt/signal.rs

//! The monitor a selecting process blocks on.
//!
//! A channel with a registered alternative does not notify its reader condvar
//! when a writer arrives; it schedules the alternative instead. The signal is
//! a four-phase state machine: `Enabling` while guards are being enabled (a
//! schedule during this window is remembered, not lost), `Waiting` while the
//! selecting thread is parked, `Ready` once any registered event has fired,
//! `Inactive` between selections.

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::telemetry::{WaitSite, WakeupObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  Inactive,
  Enabling,
  Waiting,
  Ready,
}

#[derive(Debug)]
struct Inner {
  phase: Phase,
  /// Earliest deadline among the enabled timeout guards, if any.
  deadline: Option<Instant>,
}

/// The wakeup channel between an [`Alternative`](crate::alt::Alternative) and
/// the events it is enabled on.
///
/// Opaque: guards receive a reference during their enable phase and hold it
/// until disabled, but only the kernel can act on it.
#[derive(Debug)]
pub struct AltSignal {
  inner: Mutex<Inner>,
  wakeup: Condvar,
}

impl AltSignal {
  pub(crate) fn new() -> Self {
    AltSignal {
      inner: Mutex::new(Inner { phase: Phase::Inactive, deadline: None }),
      wakeup: Condvar::new(),
    }
  }

  /// Resets the signal for a fresh enable phase.
  pub(crate) fn begin_enable(&self) {
    let mut inner = self.inner.lock();
    inner.phase = Phase::Enabling;
    inner.deadline = None;
  }

  /// Records a timeout-guard deadline; the earliest one wins.
  pub(crate) fn set_deadline(&self, deadline: Instant) {
    let mut inner = self.inner.lock();
    inner.deadline = Some(match inner.deadline {
      Some(existing) => existing.min(deadline),
      None => deadline,
    });
  }

  /// Marks the alternative ready, waking it if it is already parked.
  ///
  /// Called by a channel whose writer has deposited, by poison injection, and
  /// by a completing barrier. Idempotent; a no-op outside a selection.
  pub(crate) fn schedule(&self) {
    let mut inner = self.inner.lock();
    match inner.phase {
      Phase::Enabling => inner.phase = Phase::Ready,
      Phase::Waiting => {
        inner.phase = Phase::Ready;
        self.wakeup.notify_one();
      }
      Phase::Inactive | Phase::Ready => {}
    }
  }

  /// Parks until scheduled or until the recorded deadline passes.
  pub(crate) fn wait(&self, observer: Option<&dyn WakeupObserver>) {
    let mut inner = self.inner.lock();
    while inner.phase != Phase::Ready {
      inner.phase = Phase::Waiting;
      let deadline = inner.deadline;
      match deadline {
        Some(at) => {
          if self.wakeup.wait_until(&mut inner, at).timed_out() {
            return;
          }
        }
        None => self.wakeup.wait(&mut inner),
      }
      if inner.phase != Phase::Ready {
        log::trace!("alternative wait loop re-entered");
        if let Some(obs) = observer {
          obs.spurious_wakeup(WaitSite::Alt);
        }
      }
    }
  }

  /// Returns the signal to rest after the disable phase.
  pub(crate) fn finish(&self) {
    self.inner.lock().phase = Phase::Inactive;
  }
}
