use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicUsize, Ordering},
};

/// Set while a writer holds the lock.
const WRITER: usize = 1;
/// Set while a writer is waiting; new readers back off.
const PENDING: usize = 1 << 1;
/// One reader; the reader count lives above the two flag bits.
const READER: usize = 1 << 2;

/// A writer-preferring reader/writer spin lock.
///
/// Any number of readers may hold the lock at once; a writer excludes
/// everybody. Once a writer starts waiting, new readers spin until it has
/// been served, so a steady stream of readers cannot starve it.
///
/// The lock is not reentrant: taking a read guard while the same thread
/// already waits for, or holds, the write guard deadlocks.
pub struct RwSpinLock<T> {
    /// lock state
    /// * bit 0: writer holds the lock
    /// * bit 1: writer waiting
    /// * bits 2..: number of readers
    state: AtomicUsize,
    inner: UnsafeCell<T>,
}

// Safety: writers get exclusive access (T: Send), readers share &T (T: Sync).
unsafe impl<T: Send> Send for RwSpinLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwSpinLock<T> {}

impl<T: Default> Default for RwSpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> RwSpinLock<T> {
    pub const fn new(inner: T) -> Self {
        Self {
            state: AtomicUsize::new(0),
            inner: UnsafeCell::new(inner),
        }
    }

    /// Try once to take a shared guard.
    #[inline]
    pub fn try_read(&self) -> Option<RwSpinReadGuard<'_, T>> {
        let prev = self.state.fetch_add(READER, Ordering::Acquire);
        if prev & (WRITER | PENDING) != 0 {
            self.state.fetch_sub(READER, Ordering::Release);
            return None;
        }
        Some(RwSpinReadGuard { lock: self })
    }

    /// Spin until a shared guard is available.
    #[inline]
    pub fn read(&self) -> RwSpinReadGuard<'_, T> {
        loop {
            if let Some(guard) = self.try_read() {
                return guard;
            }
            while self.state.load(Ordering::Relaxed) & (WRITER | PENDING) != 0 {
                spin_loop();
            }
        }
    }

    /// Try once to take the exclusive guard.
    #[inline]
    pub fn try_write(&self) -> Option<RwSpinWriteGuard<'_, T>> {
        let s = self.state.load(Ordering::Relaxed);
        if s & !PENDING != 0 {
            return None;
        }
        self.state
            .compare_exchange(s, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| RwSpinWriteGuard { lock: self })
    }

    /// Spin until the exclusive guard is available.
    ///
    /// Raises the pending flag while waiting so that readers arriving later
    /// queue up behind this writer.
    #[inline]
    pub fn write(&self) -> RwSpinWriteGuard<'_, T> {
        loop {
            let s = self.state.load(Ordering::Relaxed);
            if s & !PENDING == 0 {
                // Acquiring also clears PENDING; other waiting writers re-raise it.
                if self
                    .state
                    .compare_exchange_weak(s, WRITER, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    return RwSpinWriteGuard { lock: self };
                }
                continue;
            }
            if s & PENDING == 0 {
                self.state.fetch_or(PENDING, Ordering::Relaxed);
            }
            spin_loop();
        }
    }

    /// Closure convenience over [`read`](Self::read).
    #[inline]
    pub fn with_read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let g = self.read();
        f(&g)
    }

    /// Closure convenience over [`write`](Self::write).
    #[inline]
    pub fn with_write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut g = self.write();
        f(&mut g)
    }

    /// Number of readers currently holding the lock.
    #[inline]
    #[must_use]
    pub fn readers(&self) -> usize {
        self.state.load(Ordering::Relaxed) / READER
    }

    /// Whether a writer currently holds the lock.
    #[inline]
    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) & WRITER != 0
    }

    /// Mutable access when you have `&mut self` (no contention possible).
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

pub struct RwSpinReadGuard<'a, T> {
    lock: &'a RwSpinLock<T>,
}

impl<T> Deref for RwSpinReadGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: readers only ever hand out shared references.
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> Drop for RwSpinReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.state.fetch_sub(READER, Ordering::Release);
    }
}

pub struct RwSpinWriteGuard<'a, T> {
    lock: &'a RwSpinLock<T>,
}

impl<T> Deref for RwSpinWriteGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: the writer is exclusive.
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> DerefMut for RwSpinWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the writer is exclusive.
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T> Drop for RwSpinWriteGuard<'_, T> {
    fn drop(&mut self) {
        // Release publishes the critical section; a waiting writer's PENDING bit survives.
        self.lock.state.fetch_and(!WRITER, Ordering::Release);
    }
}
