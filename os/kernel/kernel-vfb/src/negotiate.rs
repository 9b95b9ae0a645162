//! Geometry negotiation against a device's mode table.

use crate::display::ScreenInfo;
use crate::{Geometry, Mode, VfbError};

/// Depths a mode may use.
pub const SUPPORTED_DEPTHS: [u32; 5] = [1, 8, 16, 24, 32];

/// Outcome of a successful negotiation. Nothing is committed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated {
    /// Index of the selected entry in the mode table.
    pub index: usize,
    pub mode: Mode,
    pub screen: ScreenInfo,
    /// Bytes per scan line.
    pub line_length: u32,
}

/// Pick the mode for `requested` and validate it.
///
/// An entry matching width, height and depth wins over one matching only
/// width and height; without either, the mode at `current` is kept. The
/// selected mode must have a non-zero size, a supported depth, and fit in
/// `backing_len` bytes.
///
/// # Errors
/// - [`VfbError::InvalidGeometry`] for a zero width or height.
/// - [`VfbError::Unsupported`] for a depth outside [`SUPPORTED_DEPTHS`].
/// - [`VfbError::InsufficientBackingStore`] if the frame does not fit.
/// - [`VfbError::InvalidArgument`] if `current` is not a table index.
pub fn negotiate(
    modes: &[Mode],
    requested: Geometry,
    current: usize,
    backing_len: usize,
) -> Result<Negotiated, VfbError> {
    let same_size = |m: &Mode| m.width == requested.width && m.height == requested.height;

    let index = modes
        .iter()
        .position(|m| same_size(m) && m.bits_per_pixel == requested.bits_per_pixel)
        .or_else(|| modes.iter().position(same_size))
        .unwrap_or(current);
    let mode = *modes.get(index).ok_or(VfbError::InvalidArgument)?;

    if mode.width == 0 || mode.height == 0 {
        return Err(VfbError::InvalidGeometry {
            width: mode.width,
            height: mode.height,
        });
    }
    if !SUPPORTED_DEPTHS.contains(&mode.bits_per_pixel) {
        return Err(VfbError::Unsupported(mode.bits_per_pixel));
    }

    let required = mode.required_bytes();
    let available = u64::try_from(backing_len).unwrap_or(u64::MAX);
    if required > available {
        return Err(VfbError::InsufficientBackingStore {
            required,
            available,
        });
    }
    let line_length =
        u32::try_from(mode.line_length()).map_err(|_| VfbError::InvalidArgument)?;

    Ok(Negotiated {
        index,
        mode,
        screen: ScreenInfo::for_mode(&mode),
        line_length,
    })
}
