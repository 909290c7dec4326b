// src/channel/mod.rs

//! Channel construction and end handles.
//!
//! A channel is created by the [`Channel`] factory (or the free functions
//! wrapping it) in one of four multiplicities, unbuffered or buffered:
//!
//! | | exclusive read | shared read |
//! |---|---|---|
//! | **exclusive write** | [`one2one`] | [`one2any`] |
//! | **shared write** | [`any2one`] | [`any2any`] |
//!
//! Exclusive ends are single handles and are not cloneable; shared ends are
//! cloneable and serialize their competing users through a FIFO
//! [`Mutex`](crate::mutex::Mutex), so every writer (and every reader)
//! eventually makes progress regardless of how the host schedules threads.
//!
//! Only the exclusive read end ([`ChannelIn`]) can take part in a selective
//! wait; shared read ends commit to their read and therefore do not implement
//! [`Guard`]. This is the compile-time form of the rule that processes
//! sharing an end may not back off.
//!
//! # Example
//!
//! ```
//! use sequent::channel;
//! use sequent::process::Parallel;
//!
//! let (tx, rx) = channel::one2one();
//! let mut par = Parallel::new();
//! par.add(move || {
//!     for i in 0..3 {
//!         tx.write(i).unwrap();
//!     }
//! });
//! par.add(move || {
//!     for i in 0..3 {
//!         assert_eq!(rx.read().unwrap(), i);
//!     }
//! });
//! par.run();
//! ```

mod core;

use std::fmt;
use std::sync::Arc;

use self::core::ChannelCore;
use crate::alt::{AltSignal, Guard};
use crate::error::Poisoned;
use crate::mutex::Mutex;
use crate::store::DataStore;
use crate::telemetry::WakeupObserver;

/// Channel factory. Carries construction-time configuration; most callers
/// use the free functions instead.
#[derive(Default)]
pub struct Channel {
  observer: Option<Arc<dyn WakeupObserver>>,
}

impl fmt::Debug for Channel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Channel")
      .field("observer", &self.observer.is_some())
      .finish()
  }
}

impl Channel {
  /// A factory with default configuration.
  pub fn new() -> Self {
    Self::default()
  }

  /// Attaches a wakeup observer to every channel this factory creates.
  pub fn observer(mut self, observer: Arc<dyn WakeupObserver>) -> Self {
    self.observer = Some(observer);
    self
  }

  fn make_core<T: Send>(&self, store: Option<Box<dyn DataStore<T>>>) -> Arc<ChannelCore<T>> {
    Arc::new(ChannelCore::new(store, self.observer.clone()))
  }

  /// An unbuffered channel between one writer and one reader.
  pub fn one2one<T: Send>(&self) -> (ChannelOut<T>, ChannelIn<T>) {
    let core = self.make_core(None);
    (
      ChannelOut { core: Arc::clone(&core), immunity: 0 },
      ChannelIn { core, immunity: 0 },
    )
  }

  /// An unbuffered channel between one writer and any number of competing
  /// readers.
  pub fn one2any<T: Send>(&self) -> (ChannelOut<T>, SharedChannelIn<T>) {
    let core = self.make_core(None);
    (
      ChannelOut { core: Arc::clone(&core), immunity: 0 },
      SharedChannelIn { core, lock: Arc::new(Mutex::new()), immunity: 0 },
    )
  }

  /// An unbuffered channel between any number of competing writers and one
  /// reader.
  pub fn any2one<T: Send>(&self) -> (SharedChannelOut<T>, ChannelIn<T>) {
    let core = self.make_core(None);
    (
      SharedChannelOut { core: Arc::clone(&core), lock: Arc::new(Mutex::new()), immunity: 0 },
      ChannelIn { core, immunity: 0 },
    )
  }

  /// An unbuffered channel shared at both ends.
  pub fn any2any<T: Send>(&self) -> (SharedChannelOut<T>, SharedChannelIn<T>) {
    let core = self.make_core(None);
    (
      SharedChannelOut { core: Arc::clone(&core), lock: Arc::new(Mutex::new()), immunity: 0 },
      SharedChannelIn { core, lock: Arc::new(Mutex::new()), immunity: 0 },
    )
  }

  /// A buffered one-to-one channel. The store prototype is cloned empty, so
  /// the caller's copy is never shared.
  pub fn buffered_one2one<T: Send>(&self, store: &dyn DataStore<T>) -> (ChannelOut<T>, ChannelIn<T>) {
    let core = self.make_core(Some(store.clone_empty()));
    (
      ChannelOut { core: Arc::clone(&core), immunity: 0 },
      ChannelIn { core, immunity: 0 },
    )
  }

  /// A buffered one-to-any channel.
  pub fn buffered_one2any<T: Send>(
    &self,
    store: &dyn DataStore<T>,
  ) -> (ChannelOut<T>, SharedChannelIn<T>) {
    let core = self.make_core(Some(store.clone_empty()));
    (
      ChannelOut { core: Arc::clone(&core), immunity: 0 },
      SharedChannelIn { core, lock: Arc::new(Mutex::new()), immunity: 0 },
    )
  }

  /// A buffered any-to-one channel.
  pub fn buffered_any2one<T: Send>(
    &self,
    store: &dyn DataStore<T>,
  ) -> (SharedChannelOut<T>, ChannelIn<T>) {
    let core = self.make_core(Some(store.clone_empty()));
    (
      SharedChannelOut { core: Arc::clone(&core), lock: Arc::new(Mutex::new()), immunity: 0 },
      ChannelIn { core, immunity: 0 },
    )
  }

  /// A buffered channel shared at both ends.
  pub fn buffered_any2any<T: Send>(
    &self,
    store: &dyn DataStore<T>,
  ) -> (SharedChannelOut<T>, SharedChannelIn<T>) {
    let core = self.make_core(Some(store.clone_empty()));
    (
      SharedChannelOut { core: Arc::clone(&core), lock: Arc::new(Mutex::new()), immunity: 0 },
      SharedChannelIn { core, lock: Arc::new(Mutex::new()), immunity: 0 },
    )
  }
}

/// An unbuffered channel between one writer and one reader.
pub fn one2one<T: Send>() -> (ChannelOut<T>, ChannelIn<T>) {
  Channel::new().one2one()
}

/// An unbuffered channel between one writer and competing readers.
pub fn one2any<T: Send>() -> (ChannelOut<T>, SharedChannelIn<T>) {
  Channel::new().one2any()
}

/// An unbuffered channel between competing writers and one reader.
pub fn any2one<T: Send>() -> (SharedChannelOut<T>, ChannelIn<T>) {
  Channel::new().any2one()
}

/// An unbuffered channel shared at both ends.
pub fn any2any<T: Send>() -> (SharedChannelOut<T>, SharedChannelIn<T>) {
  Channel::new().any2any()
}

/// A buffered one-to-one channel using a clone of `store`.
pub fn buffered_one2one<T: Send>(store: &dyn DataStore<T>) -> (ChannelOut<T>, ChannelIn<T>) {
  Channel::new().buffered_one2one(store)
}

/// A buffered one-to-any channel using a clone of `store`.
pub fn buffered_one2any<T: Send>(store: &dyn DataStore<T>) -> (ChannelOut<T>, SharedChannelIn<T>) {
  Channel::new().buffered_one2any(store)
}

/// A buffered any-to-one channel using a clone of `store`.
pub fn buffered_any2one<T: Send>(store: &dyn DataStore<T>) -> (SharedChannelOut<T>, ChannelIn<T>) {
  Channel::new().buffered_any2one(store)
}

/// A buffered any-to-any channel using a clone of `store`.
pub fn buffered_any2any<T: Send>(
  store: &dyn DataStore<T>,
) -> (SharedChannelOut<T>, SharedChannelIn<T>) {
  Channel::new().buffered_any2any(store)
}

/// The exclusive read end of a one2one or any2one channel.
///
/// Supports the extended rendezvous (`start_read`/`end_read`) and selective
/// wait (it implements [`Guard`]).
pub struct ChannelIn<T: Send> {
  core: Arc<ChannelCore<T>>,
  immunity: u32,
}

impl<T: Send> fmt::Debug for ChannelIn<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ChannelIn").field("immunity", &self.immunity).finish()
  }
}

impl<T: Send> ChannelIn<T> {
  /// Reads the next value, blocking until a writer provides one.
  pub fn read(&self) -> Result<T, Poisoned> {
    self.core.read(self.immunity)
  }

  /// Begins an extended rendezvous: returns the value while keeping the
  /// writer synchronized until [`end_read`](ChannelIn::end_read). The window
  /// typically forwards the value downstream, which orders the downstream
  /// read after the upstream write without double-buffering.
  pub fn start_read(&self) -> Result<T, Poisoned> {
    self.core.start_read(self.immunity)
  }

  /// Ends an extended rendezvous, releasing the writer.
  pub fn end_read(&self) {
    self.core.end_read();
  }

  /// Whether a `read` would complete without blocking (or fail fast with
  /// poison).
  pub fn pending(&self) -> bool {
    self.core.pending(self.immunity)
  }

  /// Poisons the channel at `strength`, waking every blocked party.
  pub fn poison(&self, strength: u32) {
    self.core.poison(strength);
  }

  /// Raises this end's poison immunity: poison at or below `level` is
  /// ignored when reading.
  pub fn immune(mut self, level: u32) -> Self {
    self.immunity = level;
    self
  }
}

impl<T: Send> Guard for ChannelIn<T> {
  fn enable(&self, signal: &Arc<AltSignal>) -> bool {
    self.core.alt_enable(signal, self.immunity)
  }

  fn disable(&self) -> bool {
    self.core.alt_disable(self.immunity)
  }
}

/// The shared read end of a one2any or any2any channel.
///
/// Cloneable; competing readers are served in FIFO order. Shared readers
/// commit to their read, so this end offers no selective wait.
pub struct SharedChannelIn<T: Send> {
  core: Arc<ChannelCore<T>>,
  lock: Arc<Mutex>,
  immunity: u32,
}

impl<T: Send> Clone for SharedChannelIn<T> {
  fn clone(&self) -> Self {
    SharedChannelIn {
      core: Arc::clone(&self.core),
      lock: Arc::clone(&self.lock),
      immunity: self.immunity,
    }
  }
}

impl<T: Send> fmt::Debug for SharedChannelIn<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SharedChannelIn")
      .field("immunity", &self.immunity)
      .finish()
  }
}

impl<T: Send> SharedChannelIn<T> {
  /// Reads the next value, queueing behind any competing readers first.
  pub fn read(&self) -> Result<T, Poisoned> {
    self.lock.claim();
    let result = self.core.read(self.immunity);
    self.lock.release();
    result
  }

  /// Begins an extended rendezvous. The claim on the shared end is held
  /// until [`end_read`](SharedChannelIn::end_read), so competing readers
  /// stay queued for the whole window.
  pub fn start_read(&self) -> Result<T, Poisoned> {
    self.lock.claim();
    match self.core.start_read(self.immunity) {
      Ok(value) => Ok(value),
      Err(poisoned) => {
        self.lock.release();
        Err(poisoned)
      }
    }
  }

  /// Ends an extended rendezvous and releases the shared end to the next
  /// competing reader.
  pub fn end_read(&self) {
    self.core.end_read();
    self.lock.release();
  }

  /// Poisons the channel at `strength`, waking every blocked party.
  pub fn poison(&self, strength: u32) {
    self.core.poison(strength);
  }

  /// Raises this handle's poison immunity.
  pub fn immune(mut self, level: u32) -> Self {
    self.immunity = level;
    self
  }
}

/// The exclusive write end of a one2one or one2any channel.
pub struct ChannelOut<T: Send> {
  core: Arc<ChannelCore<T>>,
  immunity: u32,
}

impl<T: Send> fmt::Debug for ChannelOut<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ChannelOut").field("immunity", &self.immunity).finish()
  }
}

impl<T: Send> ChannelOut<T> {
  /// Writes `value`. For an unbuffered channel this returns once a reader
  /// has taken the value (after its `end_read` for an extended rendezvous);
  /// for a buffered channel, once the value is deposited in the store.
  pub fn write(&self, value: T) -> Result<(), Poisoned> {
    self.core.write(value, self.immunity)
  }

  /// Poisons the channel at `strength`, waking every blocked party.
  pub fn poison(&self, strength: u32) {
    self.core.poison(strength);
  }

  /// Raises this end's poison immunity: poison at or below `level` is
  /// ignored when writing.
  pub fn immune(mut self, level: u32) -> Self {
    self.immunity = level;
    self
  }
}

/// The shared write end of an any2one or any2any channel.
///
/// Cloneable; competing writers are served in FIFO order.
pub struct SharedChannelOut<T: Send> {
  core: Arc<ChannelCore<T>>,
  lock: Arc<Mutex>,
  immunity: u32,
}

impl<T: Send> Clone for SharedChannelOut<T> {
  fn clone(&self) -> Self {
    SharedChannelOut {
      core: Arc::clone(&self.core),
      lock: Arc::clone(&self.lock),
      immunity: self.immunity,
    }
  }
}

impl<T: Send> fmt::Debug for SharedChannelOut<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SharedChannelOut")
      .field("immunity", &self.immunity)
      .finish()
  }
}

impl<T: Send> SharedChannelOut<T> {
  /// Writes `value`, queueing behind any competing writers first.
  pub fn write(&self, value: T) -> Result<(), Poisoned> {
    self.lock.claim();
    let result = self.core.write(value, self.immunity);
    self.lock.release();
    result
  }

  /// Poisons the channel at `strength`, waking every blocked party.
  pub fn poison(&self, strength: u32) {
    self.core.poison(strength);
  }

  /// Raises this handle's poison immunity.
  pub fn immune(mut self, level: u32) -> Self {
    self.immunity = level;
    self
  }
}
