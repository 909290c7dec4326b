#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! CSP-style concurrency for OS threads.
//!
//! Sequent provides synchronizing and buffered channels in all four
//! point-to-point multiplicities (one2one, one2any, any2one, any2any), a
//! selective wait ([`alt::Alternative`]) over channel, timeout, skip and
//! barrier guards, sticky poison for orderly network shutdown, the extended
//! rendezvous for zero-copy pipeline stages, and a [`process::Parallel`]
//! launcher composing processes over threads.
//!
//! The unbuffered channels rendezvous: a write completes exactly when the
//! matching read does. Buffered channels take a pluggable
//! [`store::DataStore`] deciding capacity and overflow policy.

pub mod alt;
pub mod channel;
pub mod error;
pub mod mutex;
pub mod process;
pub mod store;
pub mod telemetry;

pub use error::Poisoned;
