// src/mutex.rs

//! A fair binary semaphore serializing the competing users of a shared
//! channel end.
//!
//! Shared-end channels bracket their read or write path in
//! `claim()`/`release()`, so at most one reader and one writer is ever inside
//! the channel monitor. Fairness does not lean on the host's lock queueing:
//! tickets are handed out in arrival order and served strictly in that order,
//! so a continuously contending end cannot starve any single claimer.

use parking_lot::{Condvar, Mutex as PlMutex};

#[derive(Debug)]
struct Tickets {
  /// The next ticket to hand out.
  next: u64,
  /// The ticket currently allowed to hold the claim.
  serving: u64,
}

/// A non-reentrant mutual-exclusion lock with strict FIFO handover.
///
/// Unlike a scoped lock guard, claim and release are separate calls: a shared
/// read end claims in `start_read` and releases only in `end_read`, which can
/// be an arbitrary stretch of user code later.
#[derive(Debug)]
pub struct Mutex {
  tickets: PlMutex<Tickets>,
  turn: Condvar,
}

impl Mutex {
  /// Creates an unclaimed mutex.
  pub fn new() -> Self {
    Mutex {
      tickets: PlMutex::new(Tickets { next: 0, serving: 0 }),
      turn: Condvar::new(),
    }
  }

  /// Blocks until this caller owns the mutex. Claimers are served strictly
  /// in arrival order. Reentrant claims deadlock.
  pub fn claim(&self) {
    let mut tickets = self.tickets.lock();
    let ticket = tickets.next;
    tickets.next += 1;
    while tickets.serving != ticket {
      self.turn.wait(&mut tickets);
    }
  }

  /// Releases the mutex, unblocking the longest-waiting claimer.
  pub fn release(&self) {
    let mut tickets = self.tickets.lock();
    debug_assert!(tickets.serving < tickets.next, "release without a claim");
    tickets.serving += 1;
    // Every waiter re-checks its ticket; only the successor proceeds.
    self.turn.notify_all();
  }
}

impl Default for Mutex {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::thread;
  use std::time::Duration;

  #[test]
  fn claim_release_single_thread() {
    let m = Mutex::new();
    m.claim();
    m.release();
    m.claim();
    m.release();
  }

  #[test]
  fn excludes_concurrent_claimers() {
    let m = Arc::new(Mutex::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..8 {
      let m = Arc::clone(&m);
      let inside = Arc::clone(&inside);
      handles.push(thread::spawn(move || {
        for _ in 0..200 {
          m.claim();
          assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
          inside.fetch_sub(1, Ordering::SeqCst);
          m.release();
        }
      }));
    }
    for h in handles {
      h.join().unwrap();
    }
  }

  #[test]
  fn serves_claimers_in_arrival_order() {
    let m = Arc::new(Mutex::new());
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    // Hold the mutex while the claimers queue up one by one.
    m.claim();
    let mut handles = Vec::new();
    for id in 0..8 {
      let m = Arc::clone(&m);
      let order = Arc::clone(&order);
      handles.push(thread::spawn(move || {
        m.claim();
        order.lock().push(id);
        m.release();
      }));
      // Give each claimer time to take its ticket before the next arrives.
      thread::sleep(Duration::from_millis(30));
    }
    m.release();
    for h in handles {
      h.join().unwrap();
    }
    assert_eq!(*order.lock(), (0..8).collect::<Vec<_>>());
  }
}
