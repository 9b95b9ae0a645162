//! # Kernel synchronization primitives
//!
//! * [`RwSpinLock`]: writer-preferring reader/writer spin lock.
//! * [`QuiesceBarrier`]: wait-for-all-readers barrier used to drain in-flight
//!   operations before teardown.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod quiesce;
mod rw_spin_lock;

pub use quiesce::{QuiesceBarrier, QuiesceGuard};
pub use rw_spin_lock::{RwSpinLock, RwSpinReadGuard, RwSpinWriteGuard};
