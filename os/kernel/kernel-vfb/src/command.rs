//! Driver-specific command channel.

use crate::{DeviceId, VfbError};
use core::any::Any;
use log::trace;

/// Opaque per-device state a driver attaches at registration.
pub type DriverContext = dyn Any + Send + Sync;

/// An opaque driver command: a code and one argument word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    pub code: u32,
    pub argument: u64,
}

impl Command {
    #[must_use]
    pub const fn new(code: u32, argument: u64) -> Self {
        Self { code, argument }
    }
}

/// What a [`CommandHandler`] gets to see for one command.
#[derive(Clone, Copy)]
pub struct CommandRequest<'a> {
    pub device: DeviceId,
    pub command: Command,
    pub context: Option<&'a DriverContext>,
}

impl CommandRequest<'_> {
    /// The driver context downcast to `T`, if it is one.
    #[must_use]
    pub fn context<T: Any>(&self) -> Option<&T> {
        self.context.and_then(|c| c.downcast_ref())
    }
}

/// Receives the commands consumers send to a device.
///
/// Handlers run with the device's command barrier held shared, so
/// unregistering the same device from inside a handler never returns.
/// Releasing it is fine, even if that release ends up destroying it.
pub trait CommandHandler: Send + Sync {
    /// Handle one command. `Err` carries the driver's own failure code.
    ///
    /// # Errors
    /// Driver-defined.
    fn handle(&self, request: CommandRequest<'_>) -> Result<u64, i32>;
}

impl<F> CommandHandler for F
where
    F: Fn(CommandRequest<'_>) -> Result<u64, i32> + Send + Sync,
{
    fn handle(&self, request: CommandRequest<'_>) -> Result<u64, i32> {
        self(request)
    }
}

impl crate::Framebuffers {
    /// Run `command` through the device's handler.
    ///
    /// The command enters the device's barrier before it looks at the
    /// handler, so `unregister` waits for it to finish; a command that loses
    /// the race against `unregister` sees the device gone.
    ///
    /// # Errors
    /// - [`VfbError::NotFound`] unless `id` names a present device.
    /// - [`VfbError::NoHandler`] if the driver registered none.
    /// - [`VfbError::Driver`] with the handler's own failure code.
    pub fn dispatch(&self, id: DeviceId, command: Command) -> Result<u64, VfbError> {
        let device = self.present(id)?;

        let _in_flight = device.barrier.enter();
        if !device.is_present() {
            return Err(VfbError::NotFound);
        }
        let handler = device.handler.as_ref().ok_or(VfbError::NoHandler)?;

        trace!("{id}: command {:#x}", command.code);
        handler
            .handle(CommandRequest {
                device: id,
                command,
                context: device.context.as_deref(),
            })
            .map_err(VfbError::Driver)
    }
}
