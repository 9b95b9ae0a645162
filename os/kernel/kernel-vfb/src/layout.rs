//! Per-channel pixel layout.

/// Position of one color channel inside a pixel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bitfield {
    pub offset: u32,
    pub length: u32,
    /// Most significant bit is on the right; always `false` here.
    pub msb_right: bool,
}

impl Bitfield {
    #[must_use]
    pub const fn new(offset: u32, length: u32) -> Self {
        Self {
            offset,
            length,
            msb_right: false,
        }
    }
}

/// Channel layout of a packed-pixel mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorLayout {
    pub red: Bitfield,
    pub green: Bitfield,
    pub blue: Bitfield,
    pub transp: Bitfield,
}

impl ColorLayout {
    /// Layout for a depth of `bits_per_pixel`.
    ///
    /// `transparency` selects the 5/5/5/1 variant at 16 bpp and is ignored
    /// otherwise. Unknown depths get an all-zero layout.
    #[must_use]
    pub const fn for_depth(bits_per_pixel: u32, transparency: bool) -> Self {
        match bits_per_pixel {
            1 | 8 => Self {
                red: Bitfield::new(0, bits_per_pixel),
                green: Bitfield::new(0, bits_per_pixel),
                blue: Bitfield::new(0, bits_per_pixel),
                transp: Bitfield::new(0, 0),
            },
            16 if transparency => Self {
                red: Bitfield::new(0, 5),
                green: Bitfield::new(5, 5),
                blue: Bitfield::new(10, 5),
                transp: Bitfield::new(15, 1),
            },
            16 => Self {
                red: Bitfield::new(0, 5),
                green: Bitfield::new(5, 6),
                blue: Bitfield::new(11, 5),
                transp: Bitfield::new(0, 0),
            },
            24 | 32 => Self {
                red: Bitfield::new(0, 8),
                green: Bitfield::new(8, 8),
                blue: Bitfield::new(16, 8),
                transp: if bits_per_pixel == 32 {
                    Bitfield::new(24, 8)
                } else {
                    Bitfield::new(0, 0)
                },
            },
            _ => Self {
                red: Bitfield::new(0, 0),
                green: Bitfield::new(0, 0),
                blue: Bitfield::new(0, 0),
                transp: Bitfield::new(0, 0),
            },
        }
    }

    /// Whether the channels index a palette rather than encode color.
    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        self.red.offset == self.green.offset
            && self.green.offset == self.blue.offset
            && self.red.length == self.blue.length
            && self.red.length != 0
    }
}

/// Scale a 16-bit color component down to `width` bits, rounding to nearest.
///
/// Maps 0 to 0 and `0xFFFF` to the largest `width`-bit value. A width of 16
/// or more has nothing to scale and returns `value` as is.
#[must_use]
// `From` is not const; below width 16 the result has at most 16 bits.
#[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
pub const fn rescale(value: u16, width: u32) -> u32 {
    if width >= 16 {
        return value as u32;
    }
    let v = value as u64;
    (((v << width) + 0x7FFF - v) >> 16) as u32
}
