use crate::VfbError;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Deref;

/// How pixel values map to colors.
///
/// The discriminants are the codes used on the wire by user-space drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Visual {
    /// Monochrome, 0 is black.
    Mono01 = 0,
    /// Monochrome, 0 is white.
    Mono10 = 1,
    TrueColor = 2,
    PseudoColor = 3,
    DirectColor = 4,
    StaticPseudoColor = 5,
}

impl Visual {
    /// Decode a wire code; `None` for codes outside the known set.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Mono01,
            1 => Self::Mono10,
            2 => Self::TrueColor,
            3 => Self::PseudoColor,
            4 => Self::DirectColor,
            5 => Self::StaticPseudoColor,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }
}

/// Width, height and depth as asked for by a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
}

impl Geometry {
    #[must_use]
    pub const fn new(width: u32, height: u32, bits_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            bits_per_pixel,
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}", self.width, self.height, self.bits_per_pixel)
    }
}

/// One geometry a driver supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    pub visual: Visual,
    /// 16 bpp only: use the 5/5/5/1 layout with an alpha bit instead of 5/6/5.
    pub transparency: bool,
}

impl Mode {
    /// Terminator for sentinel-ended tables; everything from here on is ignored.
    pub const END: Self = Self::new(0, 0, 0, Visual::Mono01);

    #[must_use]
    pub const fn new(width: u32, height: u32, bits_per_pixel: u32, visual: Visual) -> Self {
        Self {
            width,
            height,
            bits_per_pixel,
            visual,
            transparency: false,
        }
    }

    #[must_use]
    pub const fn with_transparency(mut self, transparency: bool) -> Self {
        self.transparency = transparency;
        self
    }

    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        Geometry::new(self.width, self.height, self.bits_per_pixel)
    }

    /// Bytes per scan line, rounded up to whole bytes.
    #[must_use]
    pub fn line_length(&self) -> u64 {
        (u64::from(self.width) * u64::from(self.bits_per_pixel)).div_ceil(8)
    }

    /// Bytes the whole visible frame occupies.
    #[must_use]
    pub fn required_bytes(&self) -> u64 {
        self.line_length() * u64::from(self.height)
    }

    const fn is_end(&self) -> bool {
        self.width == 0
    }
}

/// A device's own copy of the modes it was registered with.
///
/// Never empty; the sentinel is not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTable {
    modes: Vec<Mode>,
}

impl ModeTable {
    /// Clone `modes` up to the first [`Mode::END`] (or the slice end).
    ///
    /// # Errors
    /// - [`VfbError::InvalidArgument`] if no real entry precedes the end.
    /// - [`VfbError::OutOfMemory`] if the copy cannot be allocated.
    pub fn new(modes: &[Mode]) -> Result<Self, VfbError> {
        let count = modes.iter().position(Mode::is_end).unwrap_or(modes.len());
        if count == 0 {
            return Err(VfbError::InvalidArgument);
        }

        let mut copy = Vec::new();
        copy.try_reserve_exact(count)
            .map_err(|_| VfbError::OutOfMemory)?;
        copy.extend_from_slice(&modes[..count]);
        Ok(Self { modes: copy })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Mode] {
        &self.modes
    }
}

impl Deref for ModeTable {
    type Target = [Mode];

    fn deref(&self) -> &[Mode] {
        &self.modes
    }
}
