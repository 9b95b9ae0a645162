//! The process-wide framebuffer instance.
//!
//! Drivers that have no [`Framebuffers`] of their own reach the shared one
//! through [`instance`]. It exists between [`start`] and [`stop`].

use crate::{Framebuffers, ShutdownReport, VfbConfig, VfbError};
use alloc::sync::Arc;
use kernel_sync::RwSpinLock;
use log::{info, warn};

static SERVICE: RwSpinLock<Option<Arc<Framebuffers>>> = RwSpinLock::new(None);

/// Bring up the shared instance.
///
/// # Errors
/// [`VfbError::Busy`] if it is already running.
pub fn start(config: VfbConfig) -> Result<Arc<Framebuffers>, VfbError> {
    let mut service = SERVICE.write();
    if service.is_some() {
        warn!("framebuffer service already running");
        return Err(VfbError::Busy);
    }

    let fbs = Arc::new(Framebuffers::new(config));
    *service = Some(Arc::clone(&fbs));
    info!("framebuffer service started with {} slots", fbs.capacity());
    Ok(fbs)
}

/// The shared instance.
///
/// # Errors
/// [`VfbError::NotFound`] if it is not running.
pub fn instance() -> Result<Arc<Framebuffers>, VfbError> {
    SERVICE.read().clone().ok_or(VfbError::NotFound)
}

/// Tear down the shared instance, unregistering every remaining device.
///
/// Returns `None` if it was not running.
pub fn stop() -> Option<ShutdownReport> {
    let fbs = SERVICE.write().take()?;
    let report = fbs.shutdown();
    info!("framebuffer service stopped");
    Some(report)
}
