//! # Framebuffer Backing Stores
//!
//! This crate owns the memory behind virtual framebuffers. A backing store is
//! a page-aligned, zero-filled block whose pages stay pinned for as long as
//! the store lives, so a consumer can map them into its own address space
//! and write pixels without any copy through the framework.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  BackingStore                       │
//! │    • page-rounded length, zero-filled               │
//! │    • per-page descriptors (reserved / exported)     │
//! │    • per-page export, no contiguity assumed         │
//! └─────────────────┬───────────────────┬───────────────┘
//!                   │                   │
//! ┌─────────────────▼─────────┐ ┌───────▼───────────────┐
//! │         PagePool          │ │    PageTranslator     │
//! │  • fixed page budget      │ │  • VA → PA per page   │
//! │  • OOM when exhausted     │ │  • identity default   │
//! └───────────────────────────┘ └───────────────────────┘
//! ```
//!
//! ## Export model
//!
//! The allocator hands out a *virtually* contiguous block but makes no
//! promise about the physical side. [`BackingStore::export_page`] therefore
//! resolves one page at a time through a [`PageTranslator`]; mapping code
//! walks the pages and asks for each frame separately.
//!
//! ## Usage
//! ```rust
//! use std::sync::Arc;
//! use kernel_fbmem::{BackingStore, IdentityTranslator, PagePool};
//! use kernel_info::memory::PAGE_SIZE;
//!
//! let pool = Arc::new(PagePool::new(16));
//! let store = BackingStore::allocate(&pool, 5000).unwrap();
//! assert_eq!(store.len(), 2 * PAGE_SIZE);
//! assert_eq!(pool.in_use(), 2);
//!
//! let frame = store.export_page(1, &IdentityTranslator).unwrap();
//! assert_eq!(frame.as_u64() as usize % PAGE_SIZE, 0);
//!
//! drop(store);
//! assert_eq!(pool.in_use(), 0);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod address;
mod error;
mod page;
mod pool;
mod store;
mod translate;

pub use address::PhysicalAddress;
pub use error::FbMemError;
pub use page::PageDescriptor;
pub use pool::PagePool;
pub use store::{BackingStore, StoreHandle, free};
pub use translate::{IdentityTranslator, PageTranslator};

/// Round `len` up to the next page multiple; `None` on overflow.
#[inline]
#[must_use]
pub const fn page_align(len: usize) -> Option<usize> {
    len.checked_next_multiple_of(kernel_info::memory::PAGE_SIZE)
}

/// Number of pages needed to cover `len` bytes; `None` on overflow.
#[inline]
#[must_use]
pub const fn pages_for(len: usize) -> Option<usize> {
    match page_align(len) {
        Some(aligned) => Some(aligned >> kernel_info::memory::PAGE_SHIFT),
        None => None,
    }
}
