//! Error type for collector operations

use thiserror::Error;

/// Errors reported by the collector
///
/// Construction calls fail with [`GcError::AllocationFailure`], or with
/// [`GcError::CapacityOverflow`] for array lengths no allocation could hold.
/// The remaining variants are produced by [`Manager::set_element`](crate::Manager::set_element)
/// when it is handed a handle or index it cannot honour.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GcError {
    /// Raw memory was exhausted even after a reclaiming collection
    #[error("allocation of {requested} bytes failed after collection")]
    AllocationFailure { requested: usize },

    /// The handle refers to a value that has already been reclaimed
    #[error("handle refers to a reclaimed value")]
    StaleHandle,

    /// The handle refers to a scalar where an array was required
    #[error("value is not an array")]
    NotAnArray,

    /// The slot buffer for an array of `len` elements would not fit in `usize`
    #[error("array of {len} elements exceeds addressable memory")]
    CapacityOverflow { len: usize },

    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

pub type Result<T, E = GcError> = std::result::Result<T, E>;
