//! Arc-based typed storage for zero-copy sharing of pixel buffers.
//!
//! A [`TensorStorage`] is a typed window (`offset`, `len`) into a shared
//! [`MemoryBlock`]. Clones and views only bump the reference count. The
//! storage records its own [`Ownership`]: storages built from a `Vec` own
//! their memory, storages imported from someone else's block borrow it.

use std::{marker::PhantomData, sync::Arc};

use crate::{
    memory::{BorrowedView, MemoryBlock, OwnedBuffer, Ownership},
    CpuAllocator, TensorAllocator, TensorError,
};

/// Typed, reference-counted storage over a [`MemoryBlock`].
///
/// # Thread Safety
///
/// `TensorStorage` is `Send + Sync` when `T` is; the data is only mutable
/// through `&mut self` on uniquely owned storage.
pub struct TensorStorage<T, A: TensorAllocator = CpuAllocator> {
    block: Arc<MemoryBlock<A>>,
    /// Offset into the block in bytes.
    offset: usize,
    /// Number of elements of type `T`.
    len: usize,
    ownership: Ownership,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod, A: TensorAllocator> TensorStorage<T, A> {
    /// Creates an owned storage by copying `value` into memory from `alloc`.
    ///
    /// # Errors
    ///
    /// Returns an error if memory allocation fails.
    pub fn from_vec(value: Vec<T>, alloc: A) -> Result<Self, TensorError> {
        let len = value.len();
        let buffer = OwnedBuffer::from_slice(value.as_slice(), alloc)?;
        Ok(Self {
            block: Arc::new(MemoryBlock::Owned(buffer)),
            offset: 0,
            len,
            ownership: Ownership::Owned,
            _marker: PhantomData,
        })
    }

    /// Creates a borrowed storage over `len` elements at `ptr`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `ptr` is valid for reads of `len * size_of::<T>()` bytes
    /// - `ptr` is properly aligned for type `T`
    /// - the memory outlives every clone of the returned storage and is not
    ///   written while any clone exists
    pub unsafe fn from_raw_parts(ptr: *const T, len: usize) -> Result<Self, TensorError> {
        let byte_len = byte_len_of::<T>(len)?;
        let view = BorrowedView::from_raw_parts(ptr as *const u8, byte_len)?;
        Self::from_block(Arc::new(MemoryBlock::Borrowed(view)), 0, len)
    }

    /// Creates a borrowed storage over `len` elements of an existing block.
    ///
    /// The block is shared, not copied; the returned storage reports
    /// [`Ownership::Borrowed`] regardless of who owns the block.
    ///
    /// # Errors
    ///
    /// Returns an error if the range exceeds the block or the first element
    /// is not aligned for `T`.
    pub fn from_block(
        block: Arc<MemoryBlock<A>>,
        byte_offset: usize,
        len: usize,
    ) -> Result<Self, TensorError> {
        let byte_len = byte_len_of::<T>(len)?;
        let end = byte_offset
            .checked_add(byte_len)
            .ok_or(TensorError::out_of_bounds(usize::MAX, block.len()))?;
        if end > block.len() {
            return Err(TensorError::out_of_bounds(end, block.len()));
        }

        let address = block.as_ptr() as usize + byte_offset;
        let align = std::mem::align_of::<T>();
        if address % align != 0 {
            return Err(TensorError::Misaligned { address, align });
        }

        Ok(Self {
            block,
            offset: byte_offset,
            len,
            ownership: Ownership::Borrowed,
            _marker: PhantomData,
        })
    }

    /// Returns the storage data as a slice.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: bounds and alignment were validated at construction, the
        // block keeps the memory alive and T: Pod accepts any bit pattern
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    /// Returns the storage data as a mutable slice.
    ///
    /// # Errors
    ///
    /// Borrowed storage is read-only; owned storage must not be shared.
    pub fn try_as_mut_slice(&mut self) -> Result<&mut [T], TensorError> {
        if self.ownership == Ownership::Borrowed
            || self.block.ownership() == Ownership::Borrowed
        {
            return Err(TensorError::ReadOnlyStorage);
        }
        let count = Arc::strong_count(&self.block);
        if count != 1 {
            return Err(TensorError::SharedStorage(count));
        }
        // SAFETY: the block is owned and uniquely referenced by `self`
        Ok(unsafe { std::slice::from_raw_parts_mut(self.as_ptr() as *mut T, self.len) })
    }

    /// Copies the elements into a new vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    /// Creates a zero-copy view of `len` elements starting at element `offset`.
    ///
    /// The view inherits the ownership of `self`.
    pub fn view(&self, offset: usize, len: usize) -> Result<Self, TensorError> {
        let end = offset
            .checked_add(len)
            .ok_or(TensorError::out_of_bounds(usize::MAX, self.byte_len()))?;
        if end > self.len {
            return Err(TensorError::out_of_bounds(
                byte_len_of::<T>(end)?,
                self.byte_len(),
            ));
        }
        Ok(Self {
            block: Arc::clone(&self.block),
            offset: self.offset + byte_len_of::<T>(offset)?,
            len,
            ownership: self.ownership,
            _marker: PhantomData,
        })
    }
}

impl<T, A: TensorAllocator> TensorStorage<T, A> {
    /// Returns the pointer to the first element.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        // SAFETY: offset is within the block (validated at construction)
        unsafe { self.block.as_ptr().add(self.offset) as *const T }
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the storage has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of bytes covered by this storage.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    /// Returns the offset into the underlying block in bytes.
    #[inline]
    pub fn byte_offset(&self) -> usize {
        self.offset
    }

    /// Returns whether this storage owns or borrows its memory.
    #[inline]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Returns the shared memory block.
    #[inline]
    pub fn block(&self) -> &Arc<MemoryBlock<A>> {
        &self.block
    }

    /// Returns true if no other handle references the memory block.
    #[inline]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.block) == 1
    }
}

fn byte_len_of<T>(len: usize) -> Result<usize, TensorError> {
    let elem_size = std::mem::size_of::<T>();
    len.checked_mul(elem_size)
        .ok_or(TensorError::SizeOverflow {
            count: len,
            elem_size,
        })
}

impl<T, A: TensorAllocator> Clone for TensorStorage<T, A> {
    /// Increments the reference count; the data is not copied.
    fn clone(&self) -> Self {
        Self {
            block: Arc::clone(&self.block),
            offset: self.offset,
            len: self.len,
            ownership: self.ownership,
            _marker: PhantomData,
        }
    }
}

impl<T, A: TensorAllocator> std::fmt::Debug for TensorStorage<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorStorage")
            .field("block", &self.block)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("ownership", &self.ownership)
            .finish()
    }
}

// SAFETY: the storage only exposes `&[T]` through `&self` and `&mut [T]`
// through `&mut self` on uniquely owned blocks.
unsafe impl<T: Send, A: TensorAllocator> Send for TensorStorage<T, A> {}
unsafe impl<T: Sync, A: TensorAllocator> Sync for TensorStorage<T, A> {}
