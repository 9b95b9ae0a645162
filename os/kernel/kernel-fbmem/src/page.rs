use bitfield_struct::bitfield;

/// Per-page bookkeeping of a [`BackingStore`](crate::BackingStore).
///
/// Stored as a raw `u64` inside the store so it can be updated atomically
/// while consumers export pages concurrently.
///
/// ### Bit layout
///
/// | Bits   | Name        | Meaning |
/// |--------|-------------|---------|
/// | 0      | `reserved`  | Page is pinned and may be mapped by consumers |
/// | 1      | `exported`  | Page has been handed out at least once |
/// | 2–31   | `index`     | Page index within its store |
/// | 32–63  | —           | Unused |
#[bitfield(u64)]
pub struct PageDescriptor {
    /// Pinned for the lifetime of the store; never reclaimed while set.
    pub reserved: bool,

    /// Set on the first successful export of this page.
    pub exported: bool,

    /// Position of the page in its store.
    #[bits(30)]
    pub index: u32,

    #[bits(32)]
    __: u32,
}
