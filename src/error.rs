// src/error.rs

use core::fmt;

/// Error returned by channel operations on an end whose channel has been
/// poisoned past the end's immunity level.
///
/// Poison is sticky: once an operation has returned `Poisoned`, every later
/// operation on the same end returns it as well. The usual reaction is to
/// treat it as a shutdown signal and poison one's remaining ends so the whole
/// process network winds down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poisoned {
  /// The strength the channel was poisoned with.
  pub strength: u32,
}

impl Poisoned {
  pub(crate) fn at(strength: u32) -> Self {
    Poisoned { strength }
  }
}

impl fmt::Display for Poisoned {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "channel poisoned (strength {})", self.strength)
  }
}

impl std::error::Error for Poisoned {}
