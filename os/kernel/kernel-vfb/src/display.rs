//! Screen descriptions handed to consumers.

use crate::layout::{Bitfield, ColorLayout, rescale};
use crate::{Mode, VfbError, Visual};
use kernel_info::display::{COLOR_REGISTERS, FRAMEBUFFER_ID, PSEUDO_PALETTE_ENTRIES};

/// Variable screen information: what a geometry negotiation produces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenInfo {
    pub xres: u32,
    pub yres: u32,
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    pub xoffset: u32,
    pub yoffset: u32,
    pub bits_per_pixel: u32,
    pub grayscale: bool,
    pub red: Bitfield,
    pub green: Bitfield,
    pub blue: Bitfield,
    pub transp: Bitfield,
}

impl ScreenInfo {
    /// Describe `mode` with the virtual resolution equal to the visible one
    /// and no panning.
    #[must_use]
    pub const fn for_mode(mode: &Mode) -> Self {
        let layout = ColorLayout::for_depth(mode.bits_per_pixel, mode.transparency);
        Self {
            xres: mode.width,
            yres: mode.height,
            xres_virtual: mode.width,
            yres_virtual: mode.height,
            xoffset: 0,
            yoffset: 0,
            bits_per_pixel: mode.bits_per_pixel,
            grayscale: false,
            red: layout.red,
            green: layout.green,
            blue: layout.blue,
            transp: layout.transp,
        }
    }

    #[must_use]
    pub const fn layout(&self) -> ColorLayout {
        ColorLayout {
            red: self.red,
            green: self.green,
            blue: self.blue,
            transp: self.transp,
        }
    }
}

/// Memory organization of the framebuffer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    #[default]
    PackedPixels,
}

/// Fixed screen information: set at registration, updated by mode commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedInfo {
    pub id: &'static str,
    /// Length of the backing store in bytes.
    pub smem_len: usize,
    pub line_length: u32,
    pub visual: Visual,
    pub kind: BufferKind,
}

/// Snapshot of everything a consumer can learn about a device's display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayInfo {
    /// Node number; the device's slot in the table.
    pub node: usize,
    pub fixed: FixedInfo,
    pub screen: ScreenInfo,
    /// Packed truecolor values for the first color registers.
    pub pseudo_palette: [u32; PSEUDO_PALETTE_ENTRIES],
}

impl DisplayInfo {
    pub(crate) fn new(node: usize, smem_len: usize, visual: Visual) -> Self {
        Self {
            node,
            fixed: FixedInfo {
                id: FRAMEBUFFER_ID,
                smem_len,
                line_length: 0,
                visual,
                kind: BufferKind::PackedPixels,
            },
            screen: ScreenInfo::default(),
            pseudo_palette: [0; PSEUDO_PALETTE_ENTRIES],
        }
    }

    /// Program color register `regno` with a 16-bit-per-channel color.
    ///
    /// Truecolor and pseudocolor visuals scale each channel to its field
    /// width, directcolor scales to 8 bits, other visuals keep the raw
    /// values. Only truecolor stores anything: the packed pixel goes into the
    /// pseudo palette for 16, 24 and 32 bpp.
    ///
    /// # Errors
    /// [`VfbError::InvalidArgument`] if `regno` is not a color register, or
    /// is past the pseudo palette on a truecolor visual.
    pub fn set_color_register(&mut self, regno: u32, color: Color) -> Result<(), VfbError> {
        if regno >= COLOR_REGISTERS {
            return Err(VfbError::InvalidArgument);
        }

        let s = &self.screen;
        let [red, green, blue, transp] = match self.fixed.visual {
            Visual::TrueColor | Visual::PseudoColor => [
                rescale(color.red, s.red.length),
                rescale(color.green, s.green.length),
                rescale(color.blue, s.blue.length),
                rescale(color.transp, s.transp.length),
            ],
            Visual::DirectColor => [
                rescale(color.red, 8),
                rescale(color.green, 8),
                rescale(color.blue, 8),
                rescale(color.transp, 8),
            ],
            _ => [
                u32::from(color.red),
                u32::from(color.green),
                u32::from(color.blue),
                u32::from(color.transp),
            ],
        };

        if self.fixed.visual != Visual::TrueColor {
            return Ok(());
        }
        let slot = usize::try_from(regno)
            .ok()
            .and_then(|i| self.pseudo_palette.get_mut(i))
            .ok_or(VfbError::InvalidArgument)?;

        let packed = (red << s.red.offset)
            | (green << s.green.offset)
            | (blue << s.blue.offset)
            | (transp << s.transp.offset);
        if matches!(s.bits_per_pixel, 16 | 24 | 32) {
            *slot = packed;
        }
        Ok(())
    }
}

/// A color register value, 16 bits per channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub transp: u16,
}

impl Color {
    #[must_use]
    pub const fn rgb(red: u16, green: u16, blue: u16) -> Self {
        Self {
            red,
            green,
            blue,
            transp: 0,
        }
    }

    #[must_use]
    pub const fn with_transp(mut self, transp: u16) -> Self {
        self.transp = transp;
        self
    }
}
