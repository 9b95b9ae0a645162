//! Consumer-facing framebuffer operations.

use crate::negotiate::{Negotiated, negotiate};
use crate::{Color, DeviceId, Framebuffers, Geometry, VfbError};
use alloc::vec::Vec;
use kernel_fbmem::PhysicalAddress;
use kernel_info::memory::PAGE_SIZE;
use log::debug;

/// A map target refused a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("page rejected by map target")]
pub struct MapRejected;

/// Receives the frames of a backing store, one page at a time.
///
/// This is where a consumer's page tables (or anything else that wants the
/// frames) plug in.
pub trait MapTarget {
    /// Map page `index` of the store to `frame`.
    ///
    /// # Errors
    /// [`MapRejected`] aborts the whole mapping.
    fn map_page(&mut self, index: usize, frame: PhysicalAddress) -> Result<(), MapRejected>;
}

/// Collects the frames in page order.
impl MapTarget for Vec<PhysicalAddress> {
    fn map_page(&mut self, _index: usize, frame: PhysicalAddress) -> Result<(), MapRejected> {
        self.try_reserve(1).map_err(|_| MapRejected)?;
        self.push(frame);
        Ok(())
    }
}

impl Framebuffers {
    /// Hand the frames behind the first `length` bytes of the device's
    /// backing store to `target`. Returns the number of pages mapped.
    ///
    /// # Errors
    /// - [`VfbError::NotFound`] unless `id` names a present device.
    /// - [`VfbError::InvalidArgument`] if `length` exceeds the store.
    /// - [`VfbError::MapFailed`] with the first page that could not be
    ///   resolved or that `target` rejected.
    pub fn map<T: MapTarget + ?Sized>(
        &self,
        id: DeviceId,
        length: usize,
        target: &mut T,
    ) -> Result<usize, VfbError> {
        let store = self.present(id)?.store().ok_or(VfbError::NotFound)?;
        if length > store.len() {
            return Err(VfbError::InvalidArgument);
        }

        let pages = length.div_ceil(PAGE_SIZE);
        for index in 0..pages {
            let frame = store.export_page(index, &*self.translator)?;
            target
                .map_page(index, frame)
                .map_err(|MapRejected| VfbError::MapFailed(index))?;
        }
        debug!("mapped {pages} pages of {id}");
        Ok(pages)
    }

    /// Negotiate `geometry` against the device's modes without applying it.
    ///
    /// # Errors
    /// [`VfbError::NotFound`] unless `id` names a present device, or any
    /// negotiation error.
    pub fn check_geometry(&self, id: DeviceId, geometry: Geometry) -> Result<Negotiated, VfbError> {
        let device = self.present(id)?;
        let display = device.display.read();
        negotiate(
            &device.modes,
            geometry,
            display.current_mode,
            display.info.fixed.smem_len,
        )
    }

    /// Negotiate `geometry` and make the result the device's active mode.
    ///
    /// Mode index, screen description, line length and visual change
    /// together or not at all.
    ///
    /// # Errors
    /// [`VfbError::NotFound`] unless `id` names a present device, or any
    /// negotiation error.
    pub fn set_geometry(&self, id: DeviceId, geometry: Geometry) -> Result<Negotiated, VfbError> {
        let device = self.present(id)?;
        let mut display = device.display.write();
        let negotiated = negotiate(
            &device.modes,
            geometry,
            display.current_mode,
            display.info.fixed.smem_len,
        )?;
        display.commit(&negotiated);
        debug!(
            "{id}: mode {} ({}) active",
            negotiated.index,
            negotiated.mode.geometry()
        );
        Ok(negotiated)
    }

    /// Program one color register.
    ///
    /// # Errors
    /// [`VfbError::NotFound`] unless `id` names a present device;
    /// [`VfbError::InvalidArgument`] for a register out of range.
    pub fn set_color_register(
        &self,
        id: DeviceId,
        regno: u32,
        color: Color,
    ) -> Result<(), VfbError> {
        self.present(id)?
            .display
            .write()
            .info
            .set_color_register(regno, color)
    }
}
