//! # Display Table Limits

/// Number of framebuffer slots in the device table.
pub const MAX_FRAMEBUFFERS: usize = 32;

/// Number of mode slots a user-space session gets when it adds a mode
/// without sizing its table first.
pub const DEFAULT_MODE_SLOTS: usize = 16;

/// Number of hardware color registers a device exposes.
pub const COLOR_REGISTERS: u32 = 256;

/// Number of pseudo-palette entries kept for truecolor visuals.
pub const PSEUDO_PALETTE_ENTRIES: usize = 16;

/// Identifier reported in the fixed screen information of every device.
pub const FRAMEBUFFER_ID: &str = "vfb";

const _: () = {
    assert!(MAX_FRAMEBUFFERS > 0);
    assert!(DEFAULT_MODE_SLOTS > 0);
    assert!(PSEUDO_PALETTE_ENTRIES as u32 <= COLOR_REGISTERS);
};
