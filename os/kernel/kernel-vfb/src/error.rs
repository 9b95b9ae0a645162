use kernel_fbmem::FbMemError;

/// Everything a framebuffer operation can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VfbError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("out of memory")]
    OutOfMemory,
    #[error("device table is full")]
    Busy,
    #[error("no such device")]
    NotFound,
    #[error("unsupported bits per pixel: {0}")]
    Unsupported(u32),
    #[error("mode needs {required} bytes but the backing store holds {available}")]
    InsufficientBackingStore { required: u64, available: u64 },
    #[error("device has no command handler")]
    NoHandler,
    #[error("invalid geometry {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },
    #[error("lifecycle violation: {0}")]
    LifecycleViolation(&'static str),
    #[error("driver failed with code {0}")]
    Driver(i32),
    #[error("mapping page {0} failed")]
    MapFailed(usize),
}

impl From<FbMemError> for VfbError {
    fn from(e: FbMemError) -> Self {
        match e {
            FbMemError::InvalidLength
            | FbMemError::PageOutOfRange { .. }
            | FbMemError::RangeOutOfBounds { .. } => Self::InvalidArgument,
            FbMemError::OutOfMemory => Self::OutOfMemory,
            FbMemError::Unresolvable(page) | FbMemError::NotReserved(page) => {
                Self::MapFailed(page)
            }
        }
    }
}
