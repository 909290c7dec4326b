// src/process.rs

//! Process composition: run a set of sequential units in parallel and wait
//! for all of them.

use std::panic;
use std::thread;

/// A sequential unit of execution with a single entry point.
///
/// Implemented for any `FnOnce() + Send`, so closures capturing channel ends
/// are processes as they stand.
pub trait Process: Send {
  /// Runs the process to completion, consuming it.
  fn run(self: Box<Self>);
}

impl<F: FnOnce() + Send> Process for F {
  fn run(self: Box<Self>) {
    (*self)()
  }
}

/// Runs a collection of processes concurrently, one OS thread each, and
/// returns when every one of them has returned.
///
/// If a child panics (including by propagating an uncaught
/// [`Poisoned`](crate::error::Poisoned)), the panic is re-raised on the
/// caller's thread — but only after all siblings have terminated or observed
/// the condition themselves, so no thread is abandoned mid-communication.
///
/// # Example
///
/// ```
/// use sequent::channel;
/// use sequent::process::Parallel;
///
/// let (tx, rx) = channel::one2one();
/// let mut par = Parallel::new();
/// par.add(move || tx.write(42).unwrap());
/// par.add(move || assert_eq!(rx.read().unwrap(), 42));
/// par.run();
/// ```
#[derive(Default)]
pub struct Parallel {
  processes: Vec<Box<dyn Process>>,
}

impl std::fmt::Debug for Parallel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Parallel")
      .field("processes", &self.processes.len())
      .finish()
  }
}

impl Parallel {
  /// An empty composition.
  pub fn new() -> Self {
    Parallel { processes: Vec::new() }
  }

  /// A composition over an explicit process list.
  pub fn from_processes(processes: Vec<Box<dyn Process>>) -> Self {
    Parallel { processes }
  }

  /// Adds a process to the composition.
  pub fn add(&mut self, process: impl Process + 'static) -> &mut Self {
    self.processes.push(Box::new(process));
    self
  }

  /// Runs every process on its own thread and joins them all.
  pub fn run(self) {
    let handles: Vec<_> = self
      .processes
      .into_iter()
      .map(|process| thread::spawn(move || process.run()))
      .collect();

    let mut first_panic = None;
    for handle in handles {
      if let Err(payload) = handle.join() {
        first_panic.get_or_insert(payload);
      }
    }
    if let Some(payload) = first_panic {
      panic::resume_unwind(payload);
    }
  }
}

/// Convenience wrapper: `parallel(processes).run()` runs `processes` to
/// completion.
pub fn parallel(processes: Vec<Box<dyn Process>>) -> Parallel {
  Parallel::from_processes(processes)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  #[test]
  fn runs_all_processes() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut par = Parallel::new();
    for _ in 0..4 {
      let counter = Arc::clone(&counter);
      par.add(move || {
        counter.fetch_add(1, Ordering::SeqCst);
      });
    }
    par.run();
    assert_eq!(counter.load(Ordering::SeqCst), 4);
  }

  #[test]
  fn child_panic_propagates_after_all_join() {
    let finished = Arc::new(AtomicUsize::new(0));
    let finished2 = Arc::clone(&finished);
    let mut par = Parallel::new();
    par.add(|| panic!("child died"));
    par.add(move || {
      finished2.fetch_add(1, Ordering::SeqCst);
    });
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| par.run()));
    assert!(result.is_err());
    assert_eq!(finished.load(Ordering::SeqCst), 1);
  }
}
