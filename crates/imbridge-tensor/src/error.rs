use thiserror::Error;

use crate::allocator::TensorAllocatorError;

/// Error type for storage operations.
///
/// Every variant carries enough context (requested vs available sizes,
/// addresses) for the caller to tell a producer bug from a consumer bug.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// Underlying allocation failed.
    #[error("Storage error: {0}")]
    StorageError(#[from] TensorAllocatorError),

    /// A view or element range exceeds the memory block.
    ///
    /// Both values are in bytes.
    #[error("Range ending at byte {end} exceeds memory block of {len} bytes")]
    OutOfBounds {
        /// One past the last byte requested.
        end: usize,
        /// Length of the memory block in bytes.
        len: usize,
    },

    /// The element type requires a stricter alignment than the memory offers.
    #[error("Address {address:#x} is not aligned to {align} bytes")]
    Misaligned {
        /// The first byte of the requested view.
        address: usize,
        /// The alignment required by the element type.
        align: usize,
    },

    /// The element count overflows the addressable byte range.
    #[error("Element count {count} of {elem_size}-byte elements overflows usize")]
    SizeOverflow {
        /// Requested number of elements.
        count: usize,
        /// Size of one element in bytes.
        elem_size: usize,
    },

    /// Mutable access was requested on memory the storage does not own.
    #[error("Cannot mutate borrowed storage")]
    ReadOnlyStorage,

    /// Mutable access was requested while other handles share the memory.
    #[error("Cannot mutate storage shared by {0} handles")]
    SharedStorage(usize),
}

impl TensorError {
    /// Creates an OutOfBounds error.
    pub fn out_of_bounds(end: usize, len: usize) -> Self {
        Self::OutOfBounds { end, len }
    }
}
