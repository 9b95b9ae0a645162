use crate::{FbMemError, PageDescriptor, PagePool, PageTranslator, PhysicalAddress, page_align};
use alloc::alloc::{Layout, alloc_zeroed, dealloc};
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicU64, Ordering};
use kernel_info::memory::{PAGE_SHIFT, PAGE_SIZE};
use log::{debug, trace, warn};

/// Pages addressable by the 30-bit index of a [`PageDescriptor`].
const MAX_PAGES: usize = 1 << 30;

/// Shared handle to a backing store.
pub type StoreHandle = Arc<BackingStore>;

/// Page-aligned, zero-filled pixel memory of one framebuffer.
///
/// The block is virtually contiguous for its owner, but its pages are only
/// ever handed to consumers one at a time through
/// [`export_page`](Self::export_page).
///
/// # Invariants
/// - `len` is a non-zero multiple of [`PAGE_SIZE`].
/// - Every page is marked reserved from allocation until drop.
/// - The store's pages are accounted in its [`PagePool`] until drop.
pub struct BackingStore {
    base: NonNull<u8>,
    len: usize,
    layout: Layout,
    /// One [`PageDescriptor`] per page, stored as raw bits.
    pages: Box<[AtomicU64]>,
    pool: Arc<PagePool>,
}

// Safety: the block is plain memory owned by the store. Safe methods only
// touch the atomic page descriptors; byte access is `unsafe` and carries the
// no-concurrent-access contract.
unsafe impl Send for BackingStore {}
unsafe impl Sync for BackingStore {}

impl BackingStore {
    /// Allocate a store of at least `len` bytes from `pool`.
    ///
    /// `len` is rounded up to the next page multiple; the memory is zeroed
    /// and every page marked reserved.
    ///
    /// # Errors
    /// - [`FbMemError::InvalidLength`] if `len` is zero.
    /// - [`FbMemError::OutOfMemory`] if the pool budget or the allocator
    ///   cannot satisfy the request.
    pub fn allocate(pool: &Arc<PagePool>, len: usize) -> Result<Self, FbMemError> {
        if len == 0 {
            return Err(FbMemError::InvalidLength);
        }
        let aligned = page_align(len).ok_or(FbMemError::OutOfMemory)?;
        let count = aligned >> PAGE_SHIFT;
        if count > MAX_PAGES {
            return Err(FbMemError::OutOfMemory);
        }
        let layout =
            Layout::from_size_align(aligned, PAGE_SIZE).map_err(|_| FbMemError::OutOfMemory)?;

        if !pool.reserve(count) {
            warn!(
                "backing store of {count} pages exceeds budget ({} of {} pages free)",
                pool.available(),
                pool.limit()
            );
            return Err(FbMemError::OutOfMemory);
        }

        let mut pages = Vec::new();
        if pages.try_reserve_exact(count).is_err() {
            pool.unreserve(count);
            return Err(FbMemError::OutOfMemory);
        }

        // SAFETY: `layout` has a non-zero size.
        let Some(base) = NonNull::new(unsafe { alloc_zeroed(layout) }) else {
            pool.unreserve(count);
            return Err(FbMemError::OutOfMemory);
        };

        for index in 0..count {
            #[allow(clippy::cast_possible_truncation)]
            let desc = PageDescriptor::new()
                .with_reserved(true)
                .with_index(index as u32);
            pages.push(AtomicU64::new(desc.into_bits()));
        }

        debug!("allocated backing store of {aligned} bytes ({count} pages) at {base:p}");
        Ok(Self {
            base,
            len: aligned,
            layout,
            pages: pages.into_boxed_slice(),
            pool: Arc::clone(pool),
        })
    }

    /// Length in bytes (always a page multiple).
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// A store is never empty; provided for API symmetry.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Start of the block in the owner's address space.
    #[inline]
    #[must_use]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    /// Snapshot of one page's descriptor.
    #[must_use]
    pub fn page(&self, index: usize) -> Option<PageDescriptor> {
        self.pages
            .get(index)
            .map(|bits| PageDescriptor::from_bits(bits.load(Ordering::Acquire)))
    }

    /// Snapshot of every page descriptor, in page order.
    pub fn pages(&self) -> impl Iterator<Item = PageDescriptor> + '_ {
        self.pages
            .iter()
            .map(|bits| PageDescriptor::from_bits(bits.load(Ordering::Acquire)))
    }

    /// Resolve the physical frame behind page `index`.
    ///
    /// Each call translates exactly one page; no assumption is made about
    /// neighbouring pages being physically adjacent.
    ///
    /// # Errors
    /// - [`FbMemError::PageOutOfRange`] for an index past the end.
    /// - [`FbMemError::NotReserved`] if the page lost its reservation.
    /// - [`FbMemError::Unresolvable`] if the translator finds no frame.
    pub fn export_page(
        &self,
        index: usize,
        translator: &dyn PageTranslator,
    ) -> Result<PhysicalAddress, FbMemError> {
        let Some(bits) = self.pages.get(index) else {
            return Err(FbMemError::PageOutOfRange {
                index,
                pages: self.pages.len(),
            });
        };
        if !PageDescriptor::from_bits(bits.load(Ordering::Acquire)).reserved() {
            return Err(FbMemError::NotReserved(index));
        }

        // SAFETY: index < page_count, so the offset stays inside the block.
        let va = unsafe { self.base.as_ptr().add(index << PAGE_SHIFT) };
        let pa = translator
            .translate(va)
            .ok_or(FbMemError::Unresolvable(index))?;

        bits.fetch_or(
            PageDescriptor::new().with_exported(true).into_bits(),
            Ordering::AcqRel,
        );
        trace!("exported page {index} at {va:p} -> {pa}");
        Ok(pa)
    }

    /// Copy `dst.len()` bytes starting at `offset` out of the store.
    ///
    /// # Errors
    /// [`FbMemError::RangeOutOfBounds`] if the range leaves the store.
    ///
    /// # Safety
    /// No other thread or mapping may write the range while it is copied.
    /// The store hands out shared handles, so this is the caller's contract.
    pub unsafe fn read_at(&self, offset: usize, dst: &mut [u8]) -> Result<(), FbMemError> {
        self.check_range(offset, dst.len())?;
        // SAFETY: range checked above; `dst` is a distinct Rust allocation and
        // the caller rules out concurrent writers.
        unsafe {
            ptr::copy_nonoverlapping(self.base.as_ptr().add(offset), dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }

    /// Copy `src` into the store starting at `offset`.
    ///
    /// # Errors
    /// [`FbMemError::RangeOutOfBounds`] if the range leaves the store.
    ///
    /// # Safety
    /// No other thread or mapping may read or write the range while it is
    /// copied.
    pub unsafe fn write_at(&self, offset: usize, src: &[u8]) -> Result<(), FbMemError> {
        self.check_range(offset, src.len())?;
        // SAFETY: range checked above; `src` is a distinct Rust allocation and
        // the caller rules out concurrent access.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), self.base.as_ptr().add(offset), src.len());
        }
        Ok(())
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<(), FbMemError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(FbMemError::RangeOutOfBounds {
                offset,
                len,
                store_len: self.len,
            }),
        }
    }
}

impl Drop for BackingStore {
    fn drop(&mut self) {
        let reserved = PageDescriptor::new().with_reserved(true).into_bits();
        for bits in &self.pages {
            bits.fetch_and(!reserved, Ordering::AcqRel);
        }

        // SAFETY: `base` came from `alloc_zeroed(self.layout)` and is freed once.
        unsafe { dealloc(self.base.as_ptr(), self.layout) };
        self.pool.unreserve(self.pages.len());
        debug!(
            "released backing store of {} bytes at {:p}",
            self.len, self.base
        );
    }
}

/// Drop the caller's handle to a store, if it holds one.
///
/// Returns whether a handle was released. The memory itself goes back to
/// the pool once the last handle is gone.
pub fn free(handle: &mut Option<StoreHandle>) -> bool {
    handle.take().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentityTranslator;

    /// Spreads pages across a fake physical space in reverse order with a
    /// gap between them, so consecutive pages are never adjacent.
    struct ScatterTranslator {
        base: usize,
        pages: usize,
    }

    impl PageTranslator for ScatterTranslator {
        fn translate(&self, va: *const u8) -> Option<PhysicalAddress> {
            let index = (va as usize - self.base) / PAGE_SIZE;
            let frame = (self.pages - index) * 3;
            Some(PhysicalAddress::new((frame * PAGE_SIZE) as u64))
        }
    }

    struct NothingMapped;

    impl PageTranslator for NothingMapped {
        fn translate(&self, _va: *const u8) -> Option<PhysicalAddress> {
            None
        }
    }

    fn pool(pages: usize) -> Arc<PagePool> {
        Arc::new(PagePool::new(pages))
    }

    #[test]
    fn length_is_rounded_up_to_pages() {
        let pool = pool(16);
        let s = BackingStore::allocate(&pool, 1).unwrap();
        assert_eq!(s.len(), PAGE_SIZE);
        assert_eq!(s.page_count(), 1);

        let s = BackingStore::allocate(&pool, PAGE_SIZE).unwrap();
        assert_eq!(s.len(), PAGE_SIZE);

        let s = BackingStore::allocate(&pool, PAGE_SIZE + 1).unwrap();
        assert_eq!(s.len(), 2 * PAGE_SIZE);
        assert_eq!(s.page_count(), 2);
    }

    #[test]
    fn zero_length_is_rejected() {
        let pool = pool(4);
        assert_eq!(
            BackingStore::allocate(&pool, 0).err(),
            Some(FbMemError::InvalidLength)
        );
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn memory_is_zeroed_and_page_aligned() {
        let pool = pool(4);
        let s = BackingStore::allocate(&pool, 3 * PAGE_SIZE).unwrap();
        assert_eq!(s.as_ptr() as usize % PAGE_SIZE, 0);

        let mut buf = vec![0xffu8; s.len()];
        // SAFETY: the store is not shared.
        unsafe { s.read_at(0, &mut buf).unwrap() };
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn every_page_is_reserved_with_its_index() {
        let pool = pool(8);
        let s = BackingStore::allocate(&pool, 5 * PAGE_SIZE).unwrap();
        for (i, page) in s.pages().enumerate() {
            assert!(page.reserved());
            assert!(!page.exported());
            assert_eq!(page.index() as usize, i);
        }
        assert!(s.page(5).is_none());
    }

    #[test]
    fn export_resolves_each_page_individually() {
        let pool = pool(8);
        let s = BackingStore::allocate(&pool, 4 * PAGE_SIZE).unwrap();
        let t = ScatterTranslator {
            base: s.as_ptr() as usize,
            pages: s.page_count(),
        };

        let frames: Vec<_> = (0..s.page_count())
            .map(|i| s.export_page(i, &t).unwrap())
            .collect();
        assert_eq!(frames[0].frame_number(), 12);
        assert_eq!(frames[1].frame_number(), 9);
        assert_eq!(frames[3].frame_number(), 3);
        assert!(frames.iter().all(|f| f.is_page_aligned()));
        assert!(s.pages().all(|p| p.exported()));
    }

    #[test]
    fn identity_export_matches_virtual_layout() {
        let pool = pool(4);
        let s = BackingStore::allocate(&pool, 2 * PAGE_SIZE).unwrap();
        let p0 = s.export_page(0, &IdentityTranslator).unwrap();
        let p1 = s.export_page(1, &IdentityTranslator).unwrap();
        assert_eq!(p0.as_u64(), s.as_ptr() as u64);
        assert_eq!(p1.as_u64() - p0.as_u64(), PAGE_SIZE as u64);
    }

    #[test]
    fn export_errors() {
        let pool = pool(4);
        let s = BackingStore::allocate(&pool, PAGE_SIZE).unwrap();
        assert_eq!(
            s.export_page(1, &IdentityTranslator),
            Err(FbMemError::PageOutOfRange { index: 1, pages: 1 })
        );
        assert_eq!(
            s.export_page(0, &NothingMapped),
            Err(FbMemError::Unresolvable(0))
        );
        // a failed translation does not mark the page exported
        assert!(!s.page(0).unwrap().exported());
    }

    #[test]
    fn budget_exhaustion_is_out_of_memory() {
        let pool = pool(3);
        let a = BackingStore::allocate(&pool, 2 * PAGE_SIZE).unwrap();
        assert_eq!(pool.in_use(), 2);
        assert_eq!(
            BackingStore::allocate(&pool, 2 * PAGE_SIZE).err(),
            Some(FbMemError::OutOfMemory)
        );
        // failed allocation leaves the budget untouched
        assert_eq!(pool.in_use(), 2);

        drop(a);
        assert_eq!(pool.in_use(), 0);
        assert!(BackingStore::allocate(&pool, 3 * PAGE_SIZE).is_ok());
    }

    #[test]
    fn read_write_respect_bounds() {
        let pool = pool(2);
        let s = BackingStore::allocate(&pool, PAGE_SIZE).unwrap();
        let mut out = [0u8; 4];

        // SAFETY: the store is not shared.
        unsafe {
            s.write_at(PAGE_SIZE - 4, &[1, 2, 3, 4]).unwrap();
            s.read_at(PAGE_SIZE - 4, &mut out).unwrap();
        }
        assert_eq!(out, [1, 2, 3, 4]);

        // SAFETY: as above; refused ranges must not be touched at all.
        unsafe {
            assert_eq!(
                s.write_at(PAGE_SIZE - 3, &[9; 4]),
                Err(FbMemError::RangeOutOfBounds {
                    offset: PAGE_SIZE - 3,
                    len: 4,
                    store_len: PAGE_SIZE,
                })
            );
            assert!(matches!(
                s.write_at(usize::MAX, &[9]),
                Err(FbMemError::RangeOutOfBounds { .. })
            ));
            assert!(matches!(
                s.read_at(usize::MAX, &mut out),
                Err(FbMemError::RangeOutOfBounds { .. })
            ));
            assert!(matches!(
                s.read_at(PAGE_SIZE, &mut out),
                Err(FbMemError::RangeOutOfBounds { .. })
            ));
            s.read_at(PAGE_SIZE - 4, &mut out).unwrap();
        }
        assert_eq!(out, [1, 2, 3, 4], "refused write left the store intact");
    }

    #[test]
    fn free_is_a_no_op_on_an_empty_handle() {
        let pool = pool(2);
        let mut handle = Some(Arc::new(BackingStore::allocate(&pool, 10).unwrap()));
        assert!(free(&mut handle));
        assert!(handle.is_none());
        assert_eq!(pool.in_use(), 0);
        assert!(!free(&mut handle));
    }
}
