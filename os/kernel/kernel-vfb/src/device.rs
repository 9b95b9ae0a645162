use crate::command::{CommandHandler, DriverContext};
use crate::display::DisplayInfo;
use crate::negotiate::Negotiated;
use crate::{ModeTable, VfbError};
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use kernel_fbmem::StoreHandle;
use kernel_sync::{QuiesceBarrier, RwSpinLock};

/// Identity of a registered framebuffer.
///
/// The slot is reused after a device is destroyed; the generation is not, so
/// an identity never names two devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId {
    slot: usize,
    generation: u32,
}

impl DeviceId {
    #[must_use]
    pub const fn new(slot: usize, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Table slot; also the device's node number.
    #[must_use]
    pub const fn slot(self) -> usize {
        self.slot
    }

    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fb{}.{}", self.slot, self.generation)
    }
}

/// Where a device is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Presence {
    /// Being built by `register`; not reachable yet.
    Registering = 0,
    /// Published; accepts opens and commands.
    Present = 1,
    /// Unregistered. Never goes back.
    Absent = 2,
}

impl Presence {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Registering,
            1 => Self::Present,
            _ => Self::Absent,
        }
    }
}

/// Display state changed together by mode commits.
pub(crate) struct DisplayState {
    pub current_mode: usize,
    pub info: DisplayInfo,
}

impl DisplayState {
    pub fn commit(&mut self, negotiated: &Negotiated) {
        self.current_mode = negotiated.index;
        self.info.screen = negotiated.screen;
        self.info.fixed.line_length = negotiated.line_length;
        self.info.fixed.visual = negotiated.mode.visual;
    }
}

/// One registered framebuffer.
///
/// Presence only changes under the registry's write lock; `open_count` is
/// lock-free. Teardown runs once, guarded by `destroyed`.
pub(crate) struct Device {
    pub id: DeviceId,
    presence: AtomicU8,
    open_count: AtomicUsize,
    destroyed: AtomicBool,
    pub modes: ModeTable,
    pub display: RwSpinLock<DisplayState>,
    pub store: RwSpinLock<Option<StoreHandle>>,
    pub handler: Option<Arc<dyn CommandHandler>>,
    pub context: Option<Arc<DriverContext>>,
    /// Shared by in-flight dispatches; taken exclusively to drain them.
    pub barrier: QuiesceBarrier,
}

/// Everything `register` has prepared before a slot is known.
pub(crate) struct DeviceParts {
    pub modes: ModeTable,
    pub store: StoreHandle,
    pub initial: Negotiated,
    pub handler: Option<Arc<dyn CommandHandler>>,
    pub context: Option<Arc<DriverContext>>,
}

impl Device {
    pub fn new(id: DeviceId, parts: DeviceParts) -> Self {
        let mut display = DisplayState {
            current_mode: 0,
            info: DisplayInfo::new(id.slot(), parts.store.len(), parts.initial.mode.visual),
        };
        display.commit(&parts.initial);

        Self {
            id,
            presence: AtomicU8::new(Presence::Registering as u8),
            open_count: AtomicUsize::new(0),
            destroyed: AtomicBool::new(false),
            modes: parts.modes,
            display: RwSpinLock::new(display),
            store: RwSpinLock::new(Some(parts.store)),
            handler: parts.handler,
            context: parts.context,
            barrier: QuiesceBarrier::new(),
        }
    }

    pub fn presence(&self) -> Presence {
        Presence::from_u8(self.presence.load(Ordering::Acquire))
    }

    pub fn is_present(&self) -> bool {
        self.presence() == Presence::Present
    }

    /// Caller holds the registry write lock.
    pub fn set_presence(&self, presence: Presence) {
        self.presence.store(presence as u8, Ordering::Release);
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::Acquire)
    }

    pub fn acquire(&self) -> usize {
        self.open_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drop one open reference; returns the remaining count.
    ///
    /// # Errors
    /// [`VfbError::LifecycleViolation`] if the device is not open.
    pub fn put(&self) -> Result<usize, VfbError> {
        self.open_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map(|prev| prev - 1)
            .map_err(|_| VfbError::LifecycleViolation("release without open"))
    }

    /// Claim the one-time teardown. Only the first caller gets `true`.
    pub fn claim_teardown(&self) -> bool {
        !self.destroyed.swap(true, Ordering::AcqRel)
    }

    #[cfg(test)]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub fn store(&self) -> Option<StoreHandle> {
        self.store.read().clone()
    }
}
