//! Tri-color marking states
//!
//! - White: not yet reached in the current cycle, reclaimed by sweep
//! - Gray: reached and queued, children not yet scanned
//! - Black: reached and fully scanned
//!
//! Outside of a collection every live value is white.

/// The color of a heap node during marking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Color {
    /// Potentially unreachable, candidate for collection
    #[default]
    White = 0,
    /// Reachable but not yet scanned
    Gray = 1,
    /// Reachable and fully scanned
    Black = 2,
}

impl Color {
    /// Whether marking has reached this node
    #[inline]
    pub fn is_marked(self) -> bool {
        self != Color::White
    }
}
