use crate::{ModeRecord, UserFbError};
use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use kernel_info::display::DEFAULT_MODE_SLOTS;
use kernel_vfb::{Descriptor, DeviceId, Framebuffers, Mode};
use log::{error, info};

/// The control file user-space drivers open to get a framebuffer.
///
/// Each [`open`](Self::open) yields an independent [`UserFbSession`]; the
/// file itself only counts how many of them own a registered framebuffer.
pub struct UserFb {
    fbs: Arc<Framebuffers>,
    registered: AtomicUsize,
}

impl UserFb {
    #[must_use]
    pub const fn new(fbs: Arc<Framebuffers>) -> Self {
        Self {
            fbs,
            registered: AtomicUsize::new(0),
        }
    }

    /// Start a new session on the control file.
    #[must_use]
    pub fn open(self: &Arc<Self>) -> UserFbSession {
        UserFbSession {
            file: Arc::clone(self),
            modes: None,
            device: None,
        }
    }

    /// Number of sessions that currently own a framebuffer.
    #[must_use]
    pub fn count(&self) -> usize {
        self.registered.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn framebuffers(&self) -> &Arc<Framebuffers> {
        &self.fbs
    }
}

/// One request a user-space driver can send on its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Size the mode table; only needed for more than the default slots.
    SetModeCapacity(u32),
    AddMode(ModeRecord),
    /// Set the backing length and register. No modes can be added after.
    SetVideoMemory(u32),
    CurrentMode,
    Node,
}

/// A driver's open control file.
///
/// Modes are collected first, then `set_video_memory` registers them as one
/// framebuffer. Dropping the session unregisters it again.
pub struct UserFbSession {
    file: Arc<UserFb>,
    modes: Option<ModeSlots>,
    device: Option<DeviceId>,
}

/// Mode table being filled, with the number of slots it was sized for.
struct ModeSlots {
    slots: usize,
    modes: Vec<Mode>,
}

impl ModeSlots {
    fn with_slots(slots: usize) -> Result<Self, UserFbError> {
        let mut modes = Vec::new();
        modes
            .try_reserve_exact(slots)
            .map_err(|_| UserFbError::OutOfMemory)?;
        Ok(Self { slots, modes })
    }
}

impl UserFbSession {
    /// Make room for `slots` modes.
    ///
    /// # Errors
    /// - [`UserFbError::Busy`] after registration.
    /// - [`UserFbError::InvalidArgument`] if a table exists or `slots` is 0.
    /// - [`UserFbError::OutOfMemory`] if the table cannot be allocated.
    pub fn set_mode_capacity(&mut self, slots: usize) -> Result<(), UserFbError> {
        if self.device.is_some() {
            return Err(UserFbError::Busy);
        }
        if self.modes.is_some() || slots == 0 {
            return Err(UserFbError::InvalidArgument);
        }
        self.modes = Some(ModeSlots::with_slots(slots)?);
        Ok(())
    }

    /// Append one mode, creating a table of the default size on first use.
    ///
    /// # Errors
    /// - [`UserFbError::Busy`] after registration.
    /// - [`UserFbError::InvalidArgument`] if the table is full or the record
    ///   does not describe a mode.
    pub fn add_mode(&mut self, record: ModeRecord) -> Result<(), UserFbError> {
        if self.device.is_some() {
            return Err(UserFbError::Busy);
        }
        let table = match &mut self.modes {
            Some(table) => table,
            none => none.insert(ModeSlots::with_slots(DEFAULT_MODE_SLOTS)?),
        };
        if table.modes.len() == table.slots {
            return Err(UserFbError::InvalidArgument);
        }
        table.modes.push(Mode::try_from(record)?);
        Ok(())
    }

    /// Allocate `length` bytes of pixel memory and register the framebuffer.
    ///
    /// # Errors
    /// - [`UserFbError::Busy`] after registration.
    /// - [`UserFbError::InvalidArgument`] without any modes.
    /// - [`UserFbError::Vfb`] if registration fails.
    pub fn set_video_memory(&mut self, length: u32) -> Result<(), UserFbError> {
        if self.device.is_some() {
            return Err(UserFbError::Busy);
        }
        let modes = self
            .modes
            .as_ref()
            .map(|t| t.modes.as_slice())
            .filter(|m| !m.is_empty())
            .ok_or(UserFbError::InvalidArgument)?;

        let id = self.file.fbs.register(Descriptor::new(length, modes))?;
        self.device = Some(id);
        let count = self.file.registered.fetch_add(1, Ordering::AcqRel) + 1;
        info!("user space framebuffer {id} registered ({count} total)");
        Ok(())
    }

    /// Index of the active mode.
    ///
    /// # Errors
    /// [`UserFbError::InvalidArgument`] before registration.
    pub fn current_mode(&self) -> Result<usize, UserFbError> {
        Ok(self.file.fbs.current_mode(self.registered()?)?)
    }

    /// Node number of the registered framebuffer.
    ///
    /// # Errors
    /// [`UserFbError::InvalidArgument`] before registration.
    pub fn node(&self) -> Result<usize, UserFbError> {
        Ok(self.file.fbs.display_info(self.registered()?)?.node)
    }

    /// The registered framebuffer, if any.
    #[must_use]
    pub const fn device(&self) -> Option<DeviceId> {
        self.device
    }

    /// Read the status text from `*pos` into `buf` and advance `*pos`.
    ///
    /// Returns the number of bytes copied; 0 at the end of the text.
    pub fn read_status(&self, pos: &mut usize, buf: &mut [u8]) -> usize {
        let text = format!("number of user space fb: {}\n", self.file.count());
        let rest = text.as_bytes().get(*pos..).unwrap_or_default();
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        *pos += n;
        n
    }

    /// Serve one request. Queries return their value, setters 0.
    ///
    /// # Errors
    /// Whatever the matching method returns.
    pub fn handle(&mut self, request: Request) -> Result<usize, UserFbError> {
        match request {
            Request::SetModeCapacity(slots) => {
                let slots = usize::try_from(slots).map_err(|_| UserFbError::InvalidArgument)?;
                self.set_mode_capacity(slots).map(|()| 0)
            }
            Request::AddMode(record) => self.add_mode(record).map(|()| 0),
            Request::SetVideoMemory(length) => self.set_video_memory(length).map(|()| 0),
            Request::CurrentMode => self.current_mode(),
            Request::Node => self.node(),
        }
    }

    fn registered(&self) -> Result<DeviceId, UserFbError> {
        self.device.ok_or(UserFbError::InvalidArgument)
    }
}

impl Drop for UserFbSession {
    fn drop(&mut self) {
        let Some(id) = self.device.take() else {
            return;
        };
        if let Err(e) = self.file.fbs.unregister(id) {
            error!("closing session of {id}: {e}");
        }
        self.file.registered.fetch_sub(1, Ordering::AcqRel);
    }
}
