//! # Page Translation for Backing-Store Export
//!
//! Consumers map a backing store page by page, and each page needs the
//! physical frame behind it. How that frame is found depends on the
//! platform: an identity-mapped host, a direct map with a fixed offset, or
//! a page-table walk. This trait abstracts over those strategies.
//!
//! ## See also
//! - [`BackingStore::export_page`](crate::BackingStore::export_page)

use crate::PhysicalAddress;

/// Resolves the physical frame behind one page of virtual memory.
pub trait PageTranslator: Send + Sync {
    /// Translate the page-aligned virtual address `va`.
    ///
    /// Returns `None` if the page is not backed by a frame.
    fn translate(&self, va: *const u8) -> Option<PhysicalAddress>;
}

/// Translator for identity-mapped memory: the frame address equals the
/// virtual address.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTranslator;

impl PageTranslator for IdentityTranslator {
    fn translate(&self, va: *const u8) -> Option<PhysicalAddress> {
        if va.is_null() {
            return None;
        }
        Some(PhysicalAddress::from_ptr(va))
    }
}
