//! Opaque handles to heap values
//!
//! A `Handle` names a value by its arena slot plus the generation the slot had
//! when the value was registered. Reclaiming a value bumps the slot
//! generation, so a handle that outlives its value never resolves again, even
//! after the slot is reused. Each handle also records which heap issued it,
//! so it never resolves in another manager.

use std::fmt;

/// Reference to a value owned by a [`Manager`](crate::Manager)
///
/// Handles are plain data: copying one does not keep its value alive. Only
/// reachability from the root does. A handle is only meaningful to the
/// manager that created it; any other manager treats it as stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub(crate) heap: u32,
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Handle {
    #[inline]
    pub(crate) const fn new(heap: u32, index: u32, generation: u32) -> Self {
        Self {
            heap,
            index,
            generation,
        }
    }

    /// Arena slot of the value
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}:{}v{})", self.heap, self.index, self.generation)
    }
}
