//! # Memory Layout

/// Granularity of backing-store allocation and export, in bytes.
pub const PAGE_SIZE: usize = 4096;

/// `log2(PAGE_SIZE)`.
pub const PAGE_SHIFT: u32 = 12;

/// Default upper bound on the memory all backing stores may pin at once.
///
/// 64 MiB, which covers several 1920x1080x32 surfaces.
pub const DEFAULT_VIDEO_MEMORY_BUDGET: usize = 64 * 1024 * 1024;

/// Default budget expressed in pages.
pub const DEFAULT_VIDEO_MEMORY_PAGES: usize = DEFAULT_VIDEO_MEMORY_BUDGET / PAGE_SIZE;

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(1usize << PAGE_SHIFT == PAGE_SIZE);
    assert!(DEFAULT_VIDEO_MEMORY_BUDGET.is_multiple_of(PAGE_SIZE));
};
