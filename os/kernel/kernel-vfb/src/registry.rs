use crate::VfbError;
use crate::device::{Device, DeviceId};
use alloc::sync::Arc;
use alloc::vec::Vec;
use kernel_sync::{RwSpinLock, RwSpinReadGuard, RwSpinWriteGuard};
use log::error;

#[derive(Default)]
pub(crate) struct Slot {
    /// Bumped every time the slot's device is removed.
    generation: u32,
    device: Option<Arc<Device>>,
}

impl Slot {
    fn get(&self, id: DeviceId) -> Option<&Arc<Device>> {
        if self.generation != id.generation() {
            return None;
        }
        self.device.as_ref()
    }
}

/// Fixed-capacity device table behind one reader/writer lock.
pub(crate) struct Registry {
    slots: RwSpinLock<Vec<Slot>>,
}

pub(crate) struct Table<G> {
    guard: G,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Slot::default);
        Self {
            slots: RwSpinLock::new(slots),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.read().len()
    }

    pub fn read(&self) -> Table<RwSpinReadGuard<'_, Vec<Slot>>> {
        Table {
            guard: self.slots.read(),
        }
    }

    pub fn write(&self) -> Table<RwSpinWriteGuard<'_, Vec<Slot>>> {
        Table {
            guard: self.slots.write(),
        }
    }

    /// Put the device built by `make` into the first free slot.
    ///
    /// `make` runs under the write lock with the identity the device will
    /// have. On [`VfbError::Busy`] it is not called and nothing changes.
    pub fn insert_with(
        &self,
        make: impl FnOnce(DeviceId) -> Arc<Device>,
    ) -> Result<Arc<Device>, VfbError> {
        let mut table = self.write();
        let Some((slot, entry)) = table
            .guard
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.device.is_none())
        else {
            error!("device table is full");
            return Err(VfbError::Busy);
        };

        let device = make(DeviceId::new(slot, entry.generation));
        entry.device = Some(Arc::clone(&device));
        Ok(device)
    }
}

impl<G: core::ops::Deref<Target = Vec<Slot>>> Table<G> {
    /// The device registered under `id`, whatever its presence.
    pub fn get(&self, id: DeviceId) -> Option<&Arc<Device>> {
        self.guard.get(id.slot()).and_then(|s| s.get(id))
    }

    /// The device under `id` if it is present.
    pub fn present(&self, id: DeviceId) -> Result<&Arc<Device>, VfbError> {
        self.get(id)
            .filter(|d| d.is_present())
            .ok_or(VfbError::NotFound)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.guard.iter().filter_map(|s| s.device.as_ref())
    }

    pub fn occupied(&self) -> usize {
        self.devices().count()
    }
}

impl Table<RwSpinWriteGuard<'_, Vec<Slot>>> {
    /// Clear the slot holding `device` and retire its identity.
    ///
    /// Returns `false` if the slot no longer holds that device.
    pub fn remove(&mut self, device: &Arc<Device>) -> bool {
        let Some(slot) = self.guard.get_mut(device.id.slot()) else {
            return false;
        };
        match &slot.device {
            Some(d) if Arc::ptr_eq(d, device) => {
                slot.device = None;
                slot.generation = slot.generation.wrapping_add(1);
                true
            }
            _ => false,
        }
    }
}
