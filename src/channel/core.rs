// src/channel/core.rs

//! The monitor-based kernel shared by every channel multiplicity.
//!
//! One kernel implements all four multiplicities: whether an end is shared is
//! decided outside the monitor (shared ends serialize their users through a
//! FIFO [`Mutex`](crate::mutex::Mutex) before touching the kernel), and
//! whether the channel buffers is decided by the optional [`DataStore`]. The
//! kernel therefore only ever sees one reader and one writer at a time.
//!
//! ### Synchronization shape
//!
//! A `parking_lot::Mutex` guards all channel state. Readers and writers park
//! on separate condvars so a wakeup always targets the right side; a
//! registered alternative is woken through its own signal instead of the
//! reader condvar. Every wait is loop-guarded, and a wakeup that finds its
//! predicate still unsatisfied is reported to the injected observer.
//!
//! ### Poison
//!
//! Poison is a monotone strength on the channel; every operation checks it
//! against the calling end's immunity on entry and at every wakeup. Raising
//! poison wakes both condvars and any registered alternative, so no party
//! stays blocked on a dead channel. A writer that is unparked by poison while
//! its deposit is still in the slot withdraws the deposit before returning
//! the error, keeping the channel consistent.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::alt::AltSignal;
use crate::error::Poisoned;
use crate::store::{DataStore, StoreState};
use crate::telemetry::{WaitSite, WakeupObserver};

struct State<T: Send> {
  /// The pending unbuffered value.
  slot: Option<T>,
  /// An unbuffered write has been committed and not yet released. Stays set
  /// across an extended-read window even though `slot` has been emptied.
  has_data: bool,
  /// A reader arrived first and is parked on the reader condvar.
  reader_present: bool,
  /// Between `start_read` and `end_read`.
  extended: bool,
  /// The at-most-one alternative currently enabled on the read end.
  alt: Option<Arc<AltSignal>>,
  /// Sticky poison strength; zero means healthy.
  poison: u32,
  /// Present iff the channel buffers.
  store: Option<Box<dyn DataStore<T>>>,
}

impl<T: Send> State<T> {
  fn check_poison(&self, immunity: u32) -> Result<(), Poisoned> {
    if self.poison > immunity {
      Err(Poisoned::at(self.poison))
    } else {
      Ok(())
    }
  }

  /// Whether a read would complete without blocking.
  fn readable(&self) -> bool {
    match &self.store {
      Some(store) => store.state() != StoreState::Empty,
      None => self.slot.is_some(),
    }
  }

  fn writable(&self) -> bool {
    match &self.store {
      Some(store) => store.state() != StoreState::Full,
      // An unbuffered writer always deposits immediately.
      None => true,
    }
  }
}

pub(crate) struct ChannelCore<T: Send> {
  monitor: Mutex<State<T>>,
  readers: Condvar,
  writers: Condvar,
  observer: Option<Arc<dyn WakeupObserver>>,
}

impl<T: Send> ChannelCore<T> {
  pub(crate) fn new(
    store: Option<Box<dyn DataStore<T>>>,
    observer: Option<Arc<dyn WakeupObserver>>,
  ) -> Self {
    ChannelCore {
      monitor: Mutex::new(State {
        slot: None,
        has_data: false,
        reader_present: false,
        extended: false,
        alt: None,
        poison: 0,
        store,
      }),
      readers: Condvar::new(),
      writers: Condvar::new(),
      observer,
    }
  }

  fn spurious(&self, site: WaitSite) {
    log::trace!("wait loop re-entered at {:?}", site);
    if let Some(observer) = &self.observer {
      observer.spurious_wakeup(site);
    }
  }

  /// Wakes whoever is interested in newly readable data: the registered
  /// alternative if there is one, otherwise a parked reader.
  fn wake_reader(&self, state: &State<T>) {
    if let Some(alt) = &state.alt {
      alt.schedule();
    } else if state.reader_present {
      self.readers.notify_one();
    }
  }

  pub(crate) fn write(&self, value: T, immunity: u32) -> Result<(), Poisoned> {
    let mut state = self.monitor.lock();
    state.check_poison(immunity)?;

    if state.store.is_some() {
      // Buffered: wait for space, deposit, signal the read side.
      loop {
        state.check_poison(immunity)?;
        if state.writable() {
          break;
        }
        self.writers.wait(&mut state);
        if state.poison <= immunity && !state.writable() {
          self.spurious(WaitSite::Write);
        }
      }
      state
        .store
        .as_mut()
        .expect("buffered channel lost its store")
        .put(value);
      self.wake_reader(&state);
      return Ok(());
    }

    // Unbuffered rendezvous: deposit, signal, stay parked until the reader
    // has taken the value and released us (for an extended read, until the
    // reader's end_read).
    state.slot = Some(value);
    state.has_data = true;
    self.wake_reader(&state);
    while state.has_data {
      if state.poison > immunity && !state.extended {
        // Withdraw an untaken deposit; the value is lost with the channel.
        state.slot = None;
        state.has_data = false;
        return Err(Poisoned::at(state.poison));
      }
      self.writers.wait(&mut state);
      if state.has_data && state.poison <= immunity {
        self.spurious(WaitSite::Write);
      }
    }
    Ok(())
  }

  pub(crate) fn read(&self, immunity: u32) -> Result<T, Poisoned> {
    let mut state = self.monitor.lock();
    self.await_readable(&mut state, immunity)?;

    match state.store.as_mut() {
      Some(store) => {
        let value = store.get();
        self.writers.notify_one();
        Ok(value)
      }
      None => {
        let value = state
          .slot
          .take()
          .expect("rendezvous slot empty with data flagged");
        state.has_data = false;
        self.writers.notify_one();
        Ok(value)
      }
    }
  }

  /// First half of an extended rendezvous: takes the value but keeps the
  /// writer parked until [`end_read`](ChannelCore::end_read).
  pub(crate) fn start_read(&self, immunity: u32) -> Result<T, Poisoned> {
    let mut state = self.monitor.lock();
    self.await_readable(&mut state, immunity)?;

    state.extended = true;
    match state.store.as_mut() {
      // No writer notification: the slot stays accounted until end_get.
      Some(store) => Ok(store.start_get()),
      None => Ok(
        state
          .slot
          .take()
          .expect("rendezvous slot empty with data flagged"),
      ),
    }
  }

  /// Second half of an extended rendezvous: releases the writer. Always
  /// completes normally; poison raised meanwhile surfaces on the next
  /// operation.
  pub(crate) fn end_read(&self) {
    let mut state = self.monitor.lock();
    debug_assert!(state.extended, "end_read without a matching start_read");
    if !state.extended {
      return;
    }
    state.extended = false;
    match state.store.as_mut() {
      Some(store) => store.end_get(),
      None => state.has_data = false,
    }
    self.writers.notify_one();
  }

  /// Whether a read would complete without blocking (or fail fast with
  /// poison).
  pub(crate) fn pending(&self, immunity: u32) -> bool {
    let state = self.monitor.lock();
    state.poison > immunity || state.readable()
  }

  pub(crate) fn poison(&self, strength: u32) {
    let mut state = self.monitor.lock();
    if strength > state.poison {
      state.poison = strength;
      log::trace!("channel poisoned at strength {}", strength);
    }
    self.readers.notify_all();
    self.writers.notify_all();
    if let Some(alt) = &state.alt {
      alt.schedule();
    }
  }

  /// Alternative enable: ready if readable or poisoned past the read end's
  /// immunity; otherwise registers the signal.
  ///
  /// Panics if another alternative is already registered (two selective
  /// waits may not share a read end).
  pub(crate) fn alt_enable(&self, signal: &Arc<AltSignal>, immunity: u32) -> bool {
    let mut state = self.monitor.lock();
    if state.poison > immunity || state.readable() {
      return true;
    }
    assert!(
      state.alt.is_none(),
      "channel already has a registered alternative"
    );
    state.alt = Some(Arc::clone(signal));
    false
  }

  /// Alternative disable: withdraws the registration, reporting readiness.
  pub(crate) fn alt_disable(&self, immunity: u32) -> bool {
    let mut state = self.monitor.lock();
    state.alt = None;
    state.poison > immunity || state.readable()
  }

  /// Parks the reader until data is available, re-checking poison at every
  /// wakeup.
  fn await_readable(
    &self,
    state: &mut parking_lot::MutexGuard<'_, State<T>>,
    immunity: u32,
  ) -> Result<(), Poisoned> {
    loop {
      state.check_poison(immunity)?;
      if state.readable() {
        return Ok(());
      }
      state.reader_present = true;
      self.readers.wait(state);
      state.reader_present = false;
      if state.poison <= immunity && !state.readable() {
        self.spurious(WaitSite::Read);
      }
    }
  }
}
