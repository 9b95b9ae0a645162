//! Register, open, release, unregister and destroy.
//!
//! A device goes `Registering → Present → Absent → destroyed`. Teardown
//! happens exactly once: at the end of `unregister` if nobody had the device
//! open at the moment it was marked absent, otherwise at the end of the
//! `release` that drops the last open reference. Both decisions are taken
//! against the registry lock, so they cannot both see a zero count.

use crate::command::{CommandHandler, DriverContext};
use crate::device::{Device, DeviceId, DeviceParts, Presence};
use crate::display::DisplayInfo;
use crate::negotiate::negotiate;
use crate::registry::Registry;
use crate::{Mode, ModeTable, VfbConfig, VfbError};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use kernel_fbmem::{BackingStore, PagePool, PageTranslator, StoreHandle};
use log::{debug, error, info};

/// What a driver hands to [`Framebuffers::register`].
#[derive(Clone)]
pub struct Descriptor<'a> {
    /// Bytes of pixel memory to allocate; rounded up to whole pages.
    pub backing_length: u32,
    /// Supported modes; copied, and cut at the first [`Mode::END`].
    pub modes: &'a [Mode],
    pub handler: Option<Arc<dyn CommandHandler>>,
    pub context: Option<Arc<DriverContext>>,
}

impl<'a> Descriptor<'a> {
    #[must_use]
    pub const fn new(backing_length: u32, modes: &'a [Mode]) -> Self {
        Self {
            backing_length,
            modes,
            handler: None,
            context: None,
        }
    }

    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: Arc<DriverContext>) -> Self {
        self.context = Some(context);
        self
    }
}

/// Counters over the lifetime of a [`Framebuffers`] instance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub registered: usize,
    pub destroyed: usize,
    /// Slots currently holding a device, present or awaiting teardown.
    pub occupied: usize,
}

/// Result of [`Framebuffers::shutdown`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Devices that were present and got unregistered.
    pub unregistered: usize,
    /// Devices still open; they go away with their last release.
    pub pending: usize,
}

/// The device table together with the memory and lifecycle rules around it.
pub struct Framebuffers {
    registry: Registry,
    pool: Arc<PagePool>,
    pub(crate) translator: Arc<dyn PageTranslator>,
    registered: AtomicUsize,
    destroyed: AtomicUsize,
}

impl Default for Framebuffers {
    fn default() -> Self {
        Self::new(VfbConfig::default())
    }
}

impl Framebuffers {
    #[must_use]
    pub fn new(config: VfbConfig) -> Self {
        Self {
            registry: Registry::new(config.capacity),
            pool: Arc::new(PagePool::new(config.memory_budget_pages)),
            translator: config.translator,
            registered: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
        }
    }

    /// Create a device and publish it.
    ///
    /// Copies the mode table, allocates a zeroed backing store, validates
    /// mode 0 against it and takes the first free slot. A failure at any step
    /// releases everything this call acquired.
    ///
    /// # Errors
    /// - [`VfbError::InvalidArgument`] for a zero backing length or an empty
    ///   mode table.
    /// - [`VfbError::OutOfMemory`] if the backing store does not fit.
    /// - Any negotiation error for mode 0.
    /// - [`VfbError::Busy`] if every slot is taken.
    pub fn register(&self, descriptor: Descriptor<'_>) -> Result<DeviceId, VfbError> {
        if descriptor.backing_length == 0 {
            return Err(VfbError::InvalidArgument);
        }
        let modes = ModeTable::new(descriptor.modes)?;
        let length =
            usize::try_from(descriptor.backing_length).map_err(|_| VfbError::InvalidArgument)?;
        let store: StoreHandle = Arc::new(BackingStore::allocate(&self.pool, length)?);
        let initial = negotiate(&modes, modes[0].geometry(), 0, store.len())?;

        let parts = DeviceParts {
            modes,
            store,
            initial,
            handler: descriptor.handler,
            context: descriptor.context,
        };
        let device = self.registry.insert_with(|id| {
            let device = Arc::new(Device::new(id, parts));
            device.set_presence(Presence::Present);
            device
        })?;

        self.registered.fetch_add(1, Ordering::Relaxed);
        info!(
            "registered {} ({} modes, {} byte backing store, mode 0 is {})",
            device.id,
            device.modes.len(),
            device.display.read().info.fixed.smem_len,
            initial.mode.geometry(),
        );
        Ok(device.id)
    }

    /// Take an open reference on a present device.
    ///
    /// # Errors
    /// [`VfbError::NotFound`] unless `id` names a present device.
    pub fn open(&self, id: DeviceId) -> Result<(), VfbError> {
        let table = self.registry.read();
        let count = table.present(id)?.acquire();
        debug!("opened {id} ({count} open)");
        Ok(())
    }

    /// Drop an open reference; tears the device down if it was the last one
    /// and the device is already unregistered.
    ///
    /// # Errors
    /// - [`VfbError::NotFound`] if `id` is unknown or already destroyed.
    /// - [`VfbError::LifecycleViolation`] if the device is not open.
    pub fn release(&self, id: DeviceId) -> Result<(), VfbError> {
        let device = {
            let table = self.registry.read();
            let device = table.get(id).ok_or(VfbError::NotFound)?;
            let remaining = device.put().inspect_err(|e| error!("{id}: {e}"))?;
            if remaining != 0 || device.presence() != Presence::Absent {
                return Ok(());
            }
            Arc::clone(device)
        };

        debug!("last release of unregistered {id}");
        self.destroy(&device)
    }

    /// Withdraw a device.
    ///
    /// Once this returns no lookup, open or dispatch on `id` succeeds and
    /// every command that was already running has finished. The device is
    /// destroyed now if it was not open, otherwise by its last release.
    ///
    /// # Errors
    /// - [`VfbError::NotFound`] if `id` is unknown.
    /// - [`VfbError::LifecycleViolation`] if it was unregistered before.
    pub fn unregister(&self, id: DeviceId) -> Result<(), VfbError> {
        let (device, open) = {
            let table = self.registry.write();
            let Some(device) = table.get(id) else {
                error!("unregister of unknown device {id}");
                return Err(VfbError::NotFound);
            };
            if device.presence() == Presence::Absent {
                error!("{id} unregistered twice");
                return Err(VfbError::LifecycleViolation("unregister called twice"));
            }
            device.set_presence(Presence::Absent);
            (Arc::clone(device), device.open_count())
        };
        info!("unregistered {id} ({open} open)");

        device.barrier.quiesce();
        debug!("drained commands of {id}");

        if open == 0 {
            self.destroy(&device)
        } else {
            debug!("teardown of {id} deferred to last release");
            Ok(())
        }
    }

    /// Free the device's resources and retire its slot.
    ///
    /// Refuses (and logs) unless the device is absent and closed; only the
    /// first call for a device does anything. A command still running keeps
    /// its own references to the handler, context and store.
    pub(crate) fn destroy(&self, device: &Arc<Device>) -> Result<(), VfbError> {
        let id = device.id;
        if device.presence() != Presence::Absent {
            error!("destroy of {id} while it is still present");
            return Err(VfbError::LifecycleViolation("destroy while present"));
        }
        if device.open_count() != 0 {
            error!("destroy of {id} while it is still open");
            return Err(VfbError::LifecycleViolation("destroy while open"));
        }
        if !device.claim_teardown() {
            error!("{id} destroyed twice");
            return Err(VfbError::LifecycleViolation("destroy called twice"));
        }

        // No drain here: `unregister` already did, and the last release may
        // come from a handler still inside the barrier.
        self.registry.write().remove(device);
        kernel_fbmem::free(&mut device.store.write());

        self.destroyed.fetch_add(1, Ordering::Relaxed);
        info!("destroyed {id}");
        Ok(())
    }

    /// Unregister every present device.
    ///
    /// Devices still open stay in the table until their last release.
    pub fn shutdown(&self) -> ShutdownReport {
        let present: Vec<DeviceId> = self
            .registry
            .read()
            .devices()
            .filter(|d| d.is_present())
            .map(|d| d.id)
            .collect();

        let unregistered = present
            .into_iter()
            .filter(|&id| self.unregister(id).is_ok())
            .count();
        let pending = self.registry.read().occupied();

        info!("shut down {unregistered} devices, {pending} awaiting release");
        ShutdownReport {
            unregistered,
            pending,
        }
    }

    /// Index of the active mode in the device's table.
    ///
    /// # Errors
    /// [`VfbError::NotFound`] unless `id` names a present device.
    pub fn current_mode(&self, id: DeviceId) -> Result<usize, VfbError> {
        Ok(self.present(id)?.display.read().current_mode)
    }

    /// Shared handle to the device's pixel memory.
    ///
    /// The handle keeps the memory alive even past the device's teardown.
    ///
    /// # Errors
    /// [`VfbError::NotFound`] unless `id` names a present device.
    pub fn backing_store(&self, id: DeviceId) -> Result<StoreHandle, VfbError> {
        self.present(id)?.store().ok_or(VfbError::NotFound)
    }

    /// Snapshot of the device's display description.
    ///
    /// # Errors
    /// [`VfbError::NotFound`] unless `id` names a present device.
    pub fn display_info(&self, id: DeviceId) -> Result<DisplayInfo, VfbError> {
        Ok(self.present(id)?.display.read().info.clone())
    }

    /// The context the driver registered with, if any.
    ///
    /// # Errors
    /// [`VfbError::NotFound`] unless `id` names a present device.
    pub fn private_context(&self, id: DeviceId) -> Result<Option<Arc<DriverContext>>, VfbError> {
        Ok(self.present(id)?.context.clone())
    }

    /// Copy of the device's mode table.
    ///
    /// # Errors
    /// [`VfbError::NotFound`] unless `id` names a present device.
    pub fn modes(&self, id: DeviceId) -> Result<Vec<Mode>, VfbError> {
        Ok(self.present(id)?.modes.to_vec())
    }

    /// Lifecycle state of a device that has not been destroyed yet.
    ///
    /// # Errors
    /// [`VfbError::NotFound`] if `id` is unknown or destroyed.
    pub fn presence(&self, id: DeviceId) -> Result<Presence, VfbError> {
        let table = self.registry.read();
        table
            .get(id)
            .map(|d| d.presence())
            .ok_or(VfbError::NotFound)
    }

    /// Number of open references on a device that has not been destroyed.
    ///
    /// # Errors
    /// [`VfbError::NotFound`] if `id` is unknown or destroyed.
    pub fn open_count(&self, id: DeviceId) -> Result<usize, VfbError> {
        let table = self.registry.read();
        table
            .get(id)
            .map(|d| d.open_count())
            .ok_or(VfbError::NotFound)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.registry.capacity()
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        Stats {
            registered: self.registered.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            occupied: self.registry.read().occupied(),
        }
    }

    /// Page budget shared by all backing stores of this instance.
    #[must_use]
    pub fn pool(&self) -> &PagePool {
        &self.pool
    }

    /// The present device under `id`, detached from the registry lock.
    pub(crate) fn present(&self, id: DeviceId) -> Result<Arc<Device>, VfbError> {
        self.registry.read().present(id).map(Arc::clone)
    }
}
