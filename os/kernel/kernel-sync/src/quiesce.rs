use crate::{RwSpinLock, RwSpinReadGuard};

/// A sequencing barrier that lets one party wait out every operation that
/// entered before it.
///
/// Operations bracket themselves with [`enter`](Self::enter); the returned
/// guard keeps the barrier "occupied" until dropped. [`quiesce`](Self::quiesce)
/// blocks until every guard that existed when it started has been dropped
/// and then returns immediately. No data is protected by the barrier: it is
/// purely an ordering device.
///
/// Combined with a state flag that operations check *after* entering, this
/// gives the classic drain idiom:
///
/// ```
/// use core::sync::atomic::{AtomicBool, Ordering};
/// use kernel_sync::QuiesceBarrier;
///
/// let live = AtomicBool::new(true);
/// let barrier = QuiesceBarrier::new();
///
/// // operation side
/// {
///     let _in_flight = barrier.enter();
///     if live.load(Ordering::Acquire) {
///         // ... run the operation ...
///     }
/// }
///
/// // teardown side
/// live.store(false, Ordering::Release);
/// barrier.quiesce();
/// // nothing that observed `live == true` is still running here
/// ```
///
/// Calling `quiesce` while holding a guard from the same barrier deadlocks.
pub struct QuiesceBarrier {
    lock: RwSpinLock<()>,
}

impl Default for QuiesceBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl QuiesceBarrier {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lock: RwSpinLock::new(()),
        }
    }

    /// Mark one operation as in flight until the guard is dropped.
    ///
    /// Spins while a `quiesce` is in progress.
    #[inline]
    pub fn enter(&self) -> QuiesceGuard<'_> {
        QuiesceGuard {
            _shared: self.lock.read(),
        }
    }

    /// Wait until every operation in flight at the time of the call has left.
    ///
    /// Operations entering afterwards wait for this call to finish, then
    /// proceed normally.
    #[inline]
    pub fn quiesce(&self) {
        drop(self.lock.write());
    }

    /// Number of operations currently in flight.
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.lock.readers()
    }
}

/// Proof that an operation is in flight on a [`QuiesceBarrier`].
#[must_use = "the operation leaves the barrier as soon as the guard is dropped"]
pub struct QuiesceGuard<'a> {
    _shared: RwSpinReadGuard<'a, ()>,
}
