#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FbMemError {
    #[error("backing store length must be non-zero")]
    InvalidLength,
    #[error("out of memory")]
    OutOfMemory,
    #[error("page {index} is outside a store of {pages} pages")]
    PageOutOfRange { index: usize, pages: usize },
    #[error("range {offset}+{len} exceeds a store of {store_len} bytes")]
    RangeOutOfBounds {
        offset: usize,
        len: usize,
        store_len: usize,
    },
    #[error("page {0} has no resolvable frame")]
    Unresolvable(usize),
    #[error("page {0} is not reserved")]
    NotReserved(usize),
}
