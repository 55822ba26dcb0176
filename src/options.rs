//! Collector configuration

/// Tunables for a [`Manager`](crate::Manager)
///
/// # Example
///
/// ```
/// use kehricht::{GcOptions, Manager};
///
/// let mut opts = GcOptions::DEFAULT;
/// opts.initial_threshold = 8;
/// let manager = Manager::with_options(opts.with_memory_limit(64 * 1024));
/// assert_eq!(manager.threshold(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcOptions {
    /// Live object count above which the next construction collects first.
    /// Doubled after every such collection.
    pub initial_threshold: usize,
    /// Upper bound on accounted heap bytes. `None` leaves allocation bounded
    /// only by the system allocator.
    pub memory_limit: Option<usize>,
}

impl GcOptions {
    pub const DEFAULT_THRESHOLD: usize = 64;

    pub const DEFAULT: Self = Self {
        initial_threshold: Self::DEFAULT_THRESHOLD,
        memory_limit: None,
    };

    pub const fn with_initial_threshold(mut self, threshold: usize) -> Self {
        self.initial_threshold = threshold;
        self
    }

    pub const fn with_memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = Some(limit);
        self
    }
}

impl Default for GcOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}
