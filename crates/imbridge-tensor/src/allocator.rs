use std::alloc;
use std::alloc::Layout;

use thiserror::Error;

/// An error type for storage allocator operations.
#[derive(Debug, Error, PartialEq)]
pub enum TensorAllocatorError {
    /// The requested layout is not representable.
    #[error("Invalid storage layout {0}")]
    LayoutError(core::alloc::LayoutError),

    /// The allocator returned a null pointer.
    #[error("Null pointer")]
    NullPointer,
}

/// A trait for allocating and deallocating memory for owned buffers.
///
/// # Safety
///
/// The allocator must be thread-safe: owned buffers are shared through `Arc`
/// and may be dropped on any thread.
///
/// # Methods
///
/// * `alloc` - Allocates memory with the given layout.
/// * `dealloc` - Deallocates memory previously returned by `alloc`.
pub trait TensorAllocator: Clone + Send + Sync + 'static {
    /// Allocates memory with the given layout.
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError>;

    /// Deallocates memory with the given layout.
    fn dealloc(&self, ptr: *mut u8, layout: Layout);
}

/// An allocator that uses the system allocator.
#[derive(Clone, Debug, Default)]
pub struct CpuAllocator;

impl TensorAllocator for CpuAllocator {
    /// Allocates memory with the given layout.
    ///
    /// Zero-sized layouts yield a dangling, well-aligned pointer and never
    /// reach the system allocator.
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError> {
        if layout.size() == 0 {
            return Ok(layout.align() as *mut u8);
        }
        let ptr = unsafe { alloc::alloc(layout) };
        if ptr.is_null() {
            Err(TensorAllocatorError::NullPointer)?
        }
        Ok(ptr)
    }

    /// Deallocates memory with the given layout.
    ///
    /// # Safety
    ///
    /// The pointer must come from `alloc` with the same layout.
    #[allow(clippy::not_unsafe_ptr_arg_deref)]
    fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if !ptr.is_null() && layout.size() != 0 {
            unsafe { alloc::dealloc(ptr, layout) }
        }
    }
}
