// src/alt/barrier.rs

//! A multiway synchronization event usable inside a selective wait.
//!
//! [`alting_barrier`] creates one front-end per party. A party takes part in
//! a sync either by calling [`AltingBarrier::sync`] (blocking) or by mounting
//! its front-end as a guard in an [`Alternative`](crate::alt::Alternative).
//! The barrier fires the moment every enrolled party is offering; firing
//! wakes every blocked offerer and schedules every offering alternative.
//!
//! A completed sync is latched per end and never lost: if an alternative's
//! selection resolves to some other ready guard, the end's next offer (or
//! `sync` call) consumes the latched completion immediately instead of
//! waiting for a fresh one. The sync itself counts as having happened at
//! fire time for every offering party.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::guard::Guard;
use super::signal::AltSignal;

#[derive(Debug)]
enum Offer {
  None,
  Blocking,
  Alting(Arc<AltSignal>),
}

#[derive(Debug)]
struct EndSlot {
  enrolled: bool,
  offer: Offer,
  /// A completed sync this end has not yet consumed.
  fired: bool,
}

#[derive(Debug)]
struct BarrierInner {
  ends: Vec<EndSlot>,
}

#[derive(Debug)]
struct BarrierShared {
  inner: Mutex<BarrierInner>,
  completion: Condvar,
}

impl BarrierShared {
  /// Fires the barrier if every enrolled end is currently offering.
  fn try_fire(&self, inner: &mut BarrierInner) {
    let mut enrolled = 0;
    for end in &inner.ends {
      if end.enrolled {
        enrolled += 1;
        if matches!(end.offer, Offer::None) {
          return;
        }
      }
    }
    if enrolled == 0 {
      return;
    }
    log::debug!("barrier fired with {} parties", enrolled);
    for end in inner.ends.iter_mut().filter(|e| e.enrolled) {
      if let Offer::Alting(signal) = &end.offer {
        signal.schedule();
      }
      end.offer = Offer::None;
      end.fired = true;
    }
    self.completion.notify_all();
  }
}

/// One party's front-end of a multiway barrier.
///
/// Front-ends are not cloneable; each belongs to exactly one process.
pub struct AltingBarrier {
  shared: Arc<BarrierShared>,
  id: usize,
}

impl fmt::Debug for AltingBarrier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AltingBarrier").field("id", &self.id).finish()
  }
}

/// Creates a barrier over `parties` enrolled ends, returning one front-end
/// per party.
///
/// # Panics
///
/// Panics if `parties` is zero.
pub fn alting_barrier(parties: usize) -> Vec<AltingBarrier> {
  assert!(parties > 0, "a barrier needs at least one party");
  let shared = Arc::new(BarrierShared {
    inner: Mutex::new(BarrierInner {
      ends: (0..parties)
        .map(|_| EndSlot { enrolled: true, offer: Offer::None, fired: false })
        .collect(),
    }),
    completion: Condvar::new(),
  });
  (0..parties)
    .map(|id| AltingBarrier { shared: Arc::clone(&shared), id })
    .collect()
}

impl AltingBarrier {
  /// Blocks until every enrolled party has offered.
  ///
  /// # Panics
  ///
  /// Panics if this end has resigned.
  pub fn sync(&self) {
    let mut inner = self.shared.inner.lock();
    assert!(inner.ends[self.id].enrolled, "sync on a resigned barrier end");
    if inner.ends[self.id].fired {
      inner.ends[self.id].fired = false;
      return;
    }
    inner.ends[self.id].offer = Offer::Blocking;
    self.shared.try_fire(&mut inner);
    while !inner.ends[self.id].fired {
      self.shared.completion.wait(&mut inner);
      if !inner.ends[self.id].fired {
        log::trace!("barrier wait loop re-entered");
      }
    }
    inner.ends[self.id].fired = false;
  }

  /// Leaves the barrier; the remaining parties can then complete syncs
  /// without this end. Resigning may itself complete a pending sync.
  pub fn resign(&self) {
    let mut inner = self.shared.inner.lock();
    assert!(inner.ends[self.id].enrolled, "resign on a resigned barrier end");
    inner.ends[self.id].enrolled = false;
    self.shared.try_fire(&mut inner);
  }

  /// Re-joins the barrier after a [`resign`](AltingBarrier::resign).
  pub fn enroll(&self) {
    let mut inner = self.shared.inner.lock();
    assert!(!inner.ends[self.id].enrolled, "enroll on an enrolled barrier end");
    inner.ends[self.id].enrolled = true;
  }
}

impl Guard for AltingBarrier {
  fn enable(&self, signal: &Arc<AltSignal>) -> bool {
    let mut inner = self.shared.inner.lock();
    assert!(inner.ends[self.id].enrolled, "ALT offer on a resigned barrier end");
    if inner.ends[self.id].fired {
      inner.ends[self.id].fired = false;
      return true;
    }
    inner.ends[self.id].offer = Offer::Alting(Arc::clone(signal));
    self.shared.try_fire(&mut inner);
    if inner.ends[self.id].fired {
      inner.ends[self.id].fired = false;
      true
    } else {
      false
    }
  }

  fn disable(&self) -> bool {
    let mut inner = self.shared.inner.lock();
    inner.ends[self.id].offer = Offer::None;
    if inner.ends[self.id].fired {
      inner.ends[self.id].fired = false;
      true
    } else {
      false
    }
  }
}
