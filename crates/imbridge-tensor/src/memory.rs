//! Type-erased memory blocks with explicit ownership.
//!
//! A [`MemoryBlock`] is either an [`OwnedBuffer`], allocated and freed through a
//! [`TensorAllocator`], or a [`BorrowedView`] over memory that someone else
//! allocated and will free. Typed access goes through
//! [`TensorStorage`](crate::storage::TensorStorage).

use std::{alloc::Layout, ptr::NonNull};

use crate::{allocator::TensorAllocatorError, TensorAllocator, TensorError};

/// Who is responsible for freeing a block of memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The block was allocated here and is freed when the last handle drops.
    Owned,
    /// The block belongs to an external producer. It is never freed here.
    Borrowed,
}

/// Memory allocated through a [`TensorAllocator`] and released on drop.
pub struct OwnedBuffer<A: TensorAllocator> {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
    alloc: A,
}

impl<A: TensorAllocator> OwnedBuffer<A> {
    /// Allocates `len` zeroed bytes aligned to `align`.
    pub fn zeroed(len: usize, align: usize, alloc: A) -> Result<Self, TensorError> {
        let layout =
            Layout::from_size_align(len, align).map_err(TensorAllocatorError::LayoutError)?;
        let ptr = NonNull::new(alloc.alloc(layout)?).ok_or(TensorAllocatorError::NullPointer)?;
        // SAFETY: ptr is valid for `len` writes (just allocated with this layout)
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, len) };
        Ok(Self {
            ptr,
            len,
            layout,
            alloc,
        })
    }

    /// Allocates a buffer and copies `data` into it.
    pub fn from_slice<T: bytemuck::Pod>(data: &[T], alloc: A) -> Result<Self, TensorError> {
        Self::from_bytes(bytemuck::cast_slice(data), std::mem::align_of::<T>(), alloc)
    }

    /// Allocates a buffer aligned to `align` and copies `bytes` into it.
    pub fn from_bytes(bytes: &[u8], align: usize, alloc: A) -> Result<Self, TensorError> {
        let buffer = Self::zeroed(bytes.len(), align, alloc)?;
        // SAFETY: the regions do not overlap and the destination holds bytes.len() bytes
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer.ptr.as_ptr(), bytes.len());
        }
        Ok(buffer)
    }

    /// Returns the layout used for the allocation.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns the allocator of the buffer.
    #[inline]
    pub fn alloc(&self) -> &A {
        &self.alloc
    }
}

impl<A: TensorAllocator> Drop for OwnedBuffer<A> {
    fn drop(&mut self) {
        self.alloc.dealloc(self.ptr.as_ptr(), self.layout);
    }
}

/// A read-only window over memory owned by an external producer.
///
/// Dropping a `BorrowedView` never frees anything.
#[derive(Clone, Copy)]
pub struct BorrowedView {
    ptr: NonNull<u8>,
    len: usize,
}

impl BorrowedView {
    /// Wraps externally-owned memory.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `ptr` is valid for reads of `len` bytes
    /// - the memory stays alive and unmodified for as long as any handle to
    ///   this view (or to a storage built from it) exists
    pub unsafe fn from_raw_parts(ptr: *const u8, len: usize) -> Result<Self, TensorError> {
        let ptr = NonNull::new(ptr as *mut u8).ok_or(TensorAllocatorError::NullPointer)?;
        Ok(Self { ptr, len })
    }
}

/// A block of bytes, either owned or borrowed.
pub enum MemoryBlock<A: TensorAllocator> {
    /// Memory allocated by this crate.
    Owned(OwnedBuffer<A>),
    /// Memory owned by someone else.
    Borrowed(BorrowedView),
}

impl<A: TensorAllocator> MemoryBlock<A> {
    /// Returns the pointer to the first byte.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        match self {
            Self::Owned(b) => b.ptr.as_ptr(),
            Self::Borrowed(v) => v.ptr.as_ptr(),
        }
    }

    /// Returns the number of bytes in the block.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Owned(b) => b.len,
            Self::Borrowed(v) => v.len,
        }
    }

    /// Returns true if the block has no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns who frees this block.
    #[inline]
    pub fn ownership(&self) -> Ownership {
        match self {
            Self::Owned(_) => Ownership::Owned,
            Self::Borrowed(_) => Ownership::Borrowed,
        }
    }

    /// Returns the block as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: both variants guarantee `len` readable bytes at `ptr`
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len()) }
    }
}

impl<A: TensorAllocator> std::fmt::Debug for MemoryBlock<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("ptr", &self.as_ptr())
            .field("len", &self.len())
            .field("ownership", &self.ownership())
            .finish()
    }
}

// SAFETY: the block is never mutated through a shared reference; owned memory
// is released by a thread-safe allocator and borrowed memory is read-only.
unsafe impl<A: TensorAllocator> Send for MemoryBlock<A> {}
unsafe impl<A: TensorAllocator> Sync for MemoryBlock<A> {}
