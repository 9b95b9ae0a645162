use kernel_vfb::VfbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UserFbError {
    /// The session already registered its framebuffer.
    #[error("framebuffer already registered")]
    Busy,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("out of memory")]
    OutOfMemory,
    #[error(transparent)]
    Vfb(#[from] VfbError),
}
