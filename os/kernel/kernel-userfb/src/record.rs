//! Mode records as user space writes them.

use crate::UserFbError;
use kernel_vfb::{Mode, Visual};

/// `transp_mode` value for the opaque 5/6/5 layout at 16 bpp.
pub const TRANSP_NONE: u8 = 0;
/// `transp_mode` value for the 5/5/5/1 layout at 16 bpp.
pub const TRANSP_ALPHA: u8 = 1;

/// One mode in the C layout shared with user-space drivers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ModeRecord {
    pub xres: u32,
    pub yres: u32,
    pub bpp: u32,
    /// Visual code, see [`Visual`].
    pub visual: u32,
    pub transp_mode: u8,
    pub reserved: [u8; 3],
}

impl ModeRecord {
    /// Size of a record on the wire.
    pub const SIZE: usize = size_of::<Self>();

    #[must_use]
    pub const fn new(xres: u32, yres: u32, bpp: u32, visual: u32) -> Self {
        Self {
            xres,
            yres,
            bpp,
            visual,
            transp_mode: TRANSP_NONE,
            reserved: [0; 3],
        }
    }

    /// Decode a record from native-endian bytes.
    #[must_use]
    pub const fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            xres: word(bytes, 0),
            yres: word(bytes, 4),
            bpp: word(bytes, 8),
            visual: word(bytes, 12),
            transp_mode: bytes[16],
            reserved: [bytes[17], bytes[18], bytes[19]],
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0; Self::SIZE];
        out[0..4].copy_from_slice(&self.xres.to_ne_bytes());
        out[4..8].copy_from_slice(&self.yres.to_ne_bytes());
        out[8..12].copy_from_slice(&self.bpp.to_ne_bytes());
        out[12..16].copy_from_slice(&self.visual.to_ne_bytes());
        out[16] = self.transp_mode;
        out[17..].copy_from_slice(&self.reserved);
        out
    }
}

const fn word(bytes: &[u8; ModeRecord::SIZE], at: usize) -> u32 {
    u32::from_ne_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

const _: () = assert!(ModeRecord::SIZE == 20);

impl TryFrom<ModeRecord> for Mode {
    type Error = UserFbError;

    /// Fails for unknown visual codes and for a zero width, which would end
    /// the mode table early.
    fn try_from(record: ModeRecord) -> Result<Self, UserFbError> {
        let visual = Visual::from_code(record.visual).ok_or(UserFbError::InvalidArgument)?;
        if record.xres == 0 {
            return Err(UserFbError::InvalidArgument);
        }
        Ok(Self::new(record.xres, record.yres, record.bpp, visual)
            .with_transparency(record.transp_mode == TRANSP_ALPHA))
    }
}

impl From<Mode> for ModeRecord {
    fn from(mode: Mode) -> Self {
        Self {
            transp_mode: if mode.transparency {
                TRANSP_ALPHA
            } else {
                TRANSP_NONE
            },
            ..Self::new(mode.width, mode.height, mode.bits_per_pixel, mode.visual.code())
        }
    }
}
