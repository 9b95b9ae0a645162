use alloc::sync::Arc;
use core::fmt;
use kernel_fbmem::{IdentityTranslator, PageTranslator};
use kernel_info::display::MAX_FRAMEBUFFERS;
use kernel_info::memory::DEFAULT_VIDEO_MEMORY_PAGES;

/// Runtime settings of a [`Framebuffers`](crate::Framebuffers) instance.
///
/// ```rust
/// use kernel_vfb::VfbConfig;
///
/// let config = VfbConfig::default().with_capacity(4).with_memory_budget_pages(64);
/// assert_eq!(config.capacity, 4);
/// ```
#[derive(Clone)]
pub struct VfbConfig {
    /// Number of device slots.
    pub capacity: usize,
    /// Pages all backing stores together may occupy.
    pub memory_budget_pages: usize,
    /// Resolves backing-store pages to frames when consumers map them.
    pub translator: Arc<dyn PageTranslator>,
}

impl Default for VfbConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_FRAMEBUFFERS,
            memory_budget_pages: DEFAULT_VIDEO_MEMORY_PAGES,
            translator: Arc::new(IdentityTranslator),
        }
    }
}

impl VfbConfig {
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_memory_budget_pages(mut self, pages: usize) -> Self {
        self.memory_budget_pages = pages;
        self
    }

    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn PageTranslator>) -> Self {
        self.translator = translator;
        self
    }
}

impl fmt::Debug for VfbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VfbConfig")
            .field("capacity", &self.capacity)
            .field("memory_budget_pages", &self.memory_budget_pages)
            .finish_non_exhaustive()
    }
}
