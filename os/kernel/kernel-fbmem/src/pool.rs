//! Fixed page budget shared by all backing stores of one registry.

use core::sync::atomic::{AtomicUsize, Ordering};

/// Accounting for the pages all backing stores may pin at once.
///
/// The pool does not own memory itself; it only bounds how much the stores
/// drawing from it may allocate. Exhausting the budget turns into
/// [`FbMemError::OutOfMemory`](crate::FbMemError::OutOfMemory) at allocation
/// time, exactly like running out of frames would.
pub struct PagePool {
    limit: usize,
    in_use: AtomicUsize,
}

impl Default for PagePool {
    fn default() -> Self {
        Self::new(kernel_info::memory::DEFAULT_VIDEO_MEMORY_PAGES)
    }
}

impl PagePool {
    /// A pool that admits at most `limit` pages.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            limit,
            in_use: AtomicUsize::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Pages currently pinned by live stores.
    #[inline]
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.limit.saturating_sub(self.in_use())
    }

    /// Claim `pages` from the budget; `false` (and no change) if it does not fit.
    pub(crate) fn reserve(&self, pages: usize) -> bool {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(pages).filter(|&total| total <= self.limit)
            })
            .is_ok()
    }

    /// Return `pages` to the budget.
    pub(crate) fn unreserve(&self, pages: usize) {
        let prev = self.in_use.fetch_sub(pages, Ordering::AcqRel);
        debug_assert!(prev >= pages, "page pool underflow");
    }
}
