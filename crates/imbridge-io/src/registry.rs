//! Resolution of buffer references to live memory.
//!
//! Producers hand buffers to a [`BufferRegistry`] and receive a
//! [`BufferHandle`] they can embed in a descriptor. The decoder resolves
//! references through the registry and never turns an integer into a
//! pointer.

use std::{collections::HashMap, sync::Arc};

use imbridge_image::{ComponentTag, ComponentType};
use imbridge_tensor::{
    BorrowedView, CpuAllocator, MemoryBlock, OwnedBuffer, TensorAllocator, TensorError,
    TensorStorage,
};

use crate::{
    buffer_ref::{BufferHandle, BufferRef},
    error::CodecError,
};

const MAX_COMPONENT_ALIGN: usize = std::mem::align_of::<f64>();

/// A byte range of a shared memory block, optionally tagged with its element type.
pub struct RegisteredBuffer<A: TensorAllocator = CpuAllocator> {
    block: Arc<MemoryBlock<A>>,
    byte_offset: usize,
    byte_len: usize,
    component: Option<ComponentTag>,
}

impl<A: TensorAllocator> RegisteredBuffer<A> {
    /// Describes `byte_len` bytes of `block` starting at `byte_offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range exceeds the block.
    pub fn new(
        block: Arc<MemoryBlock<A>>,
        byte_offset: usize,
        byte_len: usize,
        component: Option<ComponentTag>,
    ) -> Result<Self, TensorError> {
        let end = byte_offset
            .checked_add(byte_len)
            .ok_or(TensorError::out_of_bounds(usize::MAX, block.len()))?;
        if end > block.len() {
            return Err(TensorError::out_of_bounds(end, block.len()));
        }
        Ok(Self {
            block,
            byte_offset,
            byte_len,
            component,
        })
    }

    /// Shares the memory of `storage` without copying.
    pub fn from_storage<T: ComponentType>(storage: &TensorStorage<T, A>) -> Self {
        Self {
            block: Arc::clone(storage.block()),
            byte_offset: storage.byte_offset(),
            byte_len: storage.byte_len(),
            component: Some(T::TAG),
        }
    }

    /// Copies `data` into memory from `alloc`.
    pub fn from_vec<T: ComponentType>(data: Vec<T>, alloc: A) -> Result<Self, TensorError> {
        let buffer = OwnedBuffer::from_slice(data.as_slice(), alloc)?;
        let byte_len = std::mem::size_of_val(data.as_slice());
        Ok(Self {
            block: Arc::new(MemoryBlock::Owned(buffer)),
            byte_offset: 0,
            byte_len,
            component: Some(T::TAG),
        })
    }

    /// Copies untyped bytes into memory from `alloc`.
    ///
    /// The element type is not recorded, so any component type may be
    /// imported from the buffer. The copy is aligned for the widest component.
    pub fn from_bytes(bytes: &[u8], alloc: A) -> Result<Self, TensorError> {
        let buffer = OwnedBuffer::from_bytes(bytes, MAX_COMPONENT_ALIGN, alloc)?;
        Ok(Self {
            block: Arc::new(MemoryBlock::Owned(buffer)),
            byte_offset: 0,
            byte_len: bytes.len(),
            component: None,
        })
    }

    /// Wraps `len` elements of externally-owned memory.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `ptr` is valid for reads of `len * size_of::<T>()` bytes
    /// - the memory outlives the registry entry and every image imported
    ///   from it, and is not written meanwhile
    pub unsafe fn from_raw_parts<T: ComponentType>(
        ptr: *const T,
        len: usize,
    ) -> Result<Self, TensorError> {
        let elem_size = std::mem::size_of::<T>();
        let byte_len = len
            .checked_mul(elem_size)
            .ok_or(TensorError::SizeOverflow { count: len, elem_size })?;
        let view = BorrowedView::from_raw_parts(ptr as *const u8, byte_len)?;
        Ok(Self {
            block: Arc::new(MemoryBlock::Borrowed(view)),
            byte_offset: 0,
            byte_len,
            component: Some(T::TAG),
        })
    }

    /// Returns the shared memory block.
    pub fn block(&self) -> &Arc<MemoryBlock<A>> {
        &self.block
    }

    /// Returns the offset of the range into the block in bytes.
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Returns the length of the range in bytes.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Returns the recorded element type, if any.
    pub fn component(&self) -> Option<ComponentTag> {
        self.component
    }

    /// Returns the range as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.block.as_bytes()[self.byte_offset..self.byte_offset + self.byte_len]
    }
}

impl<A: TensorAllocator> Clone for RegisteredBuffer<A> {
    fn clone(&self) -> Self {
        Self {
            block: Arc::clone(&self.block),
            byte_offset: self.byte_offset,
            byte_len: self.byte_len,
            component: self.component,
        }
    }
}

impl<A: TensorAllocator> std::fmt::Debug for RegisteredBuffer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredBuffer")
            .field("ownership", &self.block.ownership())
            .field("byte_offset", &self.byte_offset)
            .field("byte_len", &self.byte_len)
            .field("component", &self.component)
            .finish()
    }
}

/// A resolved reference. Holding a lease keeps the memory alive even if the
/// entry is released from the registry.
#[derive(Clone, Debug)]
pub struct BufferLease<A: TensorAllocator = CpuAllocator> {
    reference: BufferRef,
    buffer: RegisteredBuffer<A>,
}

impl<A: TensorAllocator> BufferLease<A> {
    /// Returns the reference the lease was resolved from.
    pub fn reference(&self) -> &BufferRef {
        &self.reference
    }

    /// Returns the leased buffer.
    pub fn buffer(&self) -> &RegisteredBuffer<A> {
        &self.buffer
    }

    /// Returns a borrowed typed storage over the first `len` elements.
    ///
    /// When `verify_type` is set and the buffer records an element type, it
    /// must be `T`.
    ///
    /// # Errors
    ///
    /// [`CodecError::BufferMismatch`] if the element type differs or the
    /// buffer holds fewer than `len` elements, [`CodecError::Tensor`] if the
    /// memory is not aligned for `T`.
    pub fn storage<T: ComponentType>(
        &self,
        field: &'static str,
        len: usize,
        verify_type: bool,
    ) -> Result<TensorStorage<T, A>, CodecError> {
        if let Some(actual) = self.buffer.component {
            if verify_type && actual != T::TAG {
                return Err(CodecError::BufferMismatch {
                    field,
                    expected: T::TAG.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        let elem_size = std::mem::size_of::<T>();
        let needed = len
            .checked_mul(elem_size)
            .ok_or(TensorError::SizeOverflow { count: len, elem_size })?;
        if needed > self.buffer.byte_len {
            return Err(CodecError::BufferMismatch {
                field,
                expected: format!("{needed} bytes"),
                actual: format!("{} bytes", self.buffer.byte_len),
            });
        }

        Ok(TensorStorage::from_block(
            Arc::clone(&self.buffer.block),
            self.buffer.byte_offset,
            len,
        )?)
    }
}

/// Owns the association between buffer references and memory.
///
/// # Examples
///
/// ```
/// use imbridge_io::buffer_ref::BufferRef;
/// use imbridge_io::registry::BufferRegistry;
///
/// let mut registry = BufferRegistry::new();
/// let handle = registry.register_vec(vec![1u8, 2, 3, 4]).unwrap();
/// let lease = registry.borrow(&BufferRef::from(handle)).unwrap();
/// assert_eq!(lease.buffer().as_bytes(), &[1, 2, 3, 4]);
/// ```
pub struct BufferRegistry<A: TensorAllocator = CpuAllocator> {
    buffers: HashMap<BufferRef, RegisteredBuffer<A>>,
    next_handle: u64,
    alloc: A,
}

impl BufferRegistry<CpuAllocator> {
    /// Creates an empty registry backed by the system allocator.
    pub fn new() -> Self {
        Self::with_allocator(CpuAllocator)
    }
}

impl Default for BufferRegistry<CpuAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: TensorAllocator> BufferRegistry<A> {
    /// Creates an empty registry that copies buffers into memory from `alloc`.
    pub fn with_allocator(alloc: A) -> Self {
        Self {
            buffers: HashMap::new(),
            next_handle: 1,
            alloc,
        }
    }

    fn next_handle(&mut self) -> BufferHandle {
        loop {
            let handle = BufferHandle(self.next_handle);
            self.next_handle = self.next_handle.wrapping_add(1).max(1);
            if !self.buffers.contains_key(&BufferRef::Address(handle)) {
                return handle;
            }
        }
    }

    fn register(&mut self, buffer: RegisteredBuffer<A>) -> BufferHandle {
        let handle = self.next_handle();
        log::trace!(
            "registering {} bytes of {:?} under handle {handle}",
            buffer.byte_len,
            buffer.component
        );
        self.buffers.insert(BufferRef::Address(handle), buffer);
        handle
    }

    /// Copies `data` into the registry and returns its handle.
    pub fn register_vec<T: ComponentType>(&mut self, data: Vec<T>) -> Result<BufferHandle, CodecError> {
        let buffer = RegisteredBuffer::from_vec(data, self.alloc.clone())?;
        Ok(self.register(buffer))
    }

    /// Registers externally-owned memory without copying it.
    ///
    /// # Safety
    ///
    /// Same contract as [`RegisteredBuffer::from_raw_parts`].
    pub unsafe fn register_raw<T: ComponentType>(
        &mut self,
        ptr: *const T,
        len: usize,
    ) -> Result<BufferHandle, CodecError> {
        let buffer = RegisteredBuffer::from_raw_parts(ptr, len)?;
        Ok(self.register(buffer))
    }

    /// Shares the memory of `storage` and returns its handle.
    pub fn register_storage<T: ComponentType>(&mut self, storage: &TensorStorage<T, A>) -> BufferHandle {
        self.register(RegisteredBuffer::from_storage(storage))
    }

    /// Binds a buffer to a reference chosen by the producer.
    ///
    /// Returns the buffer previously bound to the reference, if any.
    pub fn insert(
        &mut self,
        reference: BufferRef,
        buffer: RegisteredBuffer<A>,
    ) -> Option<RegisteredBuffer<A>> {
        log::trace!("binding {} bytes to {reference}", buffer.byte_len);
        self.buffers.insert(reference, buffer)
    }

    /// Resolves a reference.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnknownBuffer`] if nothing is bound to the reference.
    pub fn borrow(&self, reference: &BufferRef) -> Result<BufferLease<A>, CodecError> {
        let buffer = self
            .buffers
            .get(reference)
            .ok_or_else(|| CodecError::UnknownBuffer(reference.encode()))?;
        Ok(BufferLease {
            reference: reference.clone(),
            buffer: buffer.clone(),
        })
    }

    /// Removes a reference from the registry.
    ///
    /// Memory stays alive while leases or imported images still share it.
    pub fn release(&mut self, reference: &BufferRef) -> Result<RegisteredBuffer<A>, CodecError> {
        self.buffers
            .remove(reference)
            .ok_or_else(|| CodecError::UnknownBuffer(reference.encode()))
    }

    /// Returns true if a buffer is bound to the reference.
    pub fn contains(&self, reference: &BufferRef) -> bool {
        self.buffers.contains_key(reference)
    }

    /// Returns the number of bound references.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns true if no reference is bound.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Returns the allocator used for copies.
    pub fn alloc(&self) -> &A {
        &self.alloc
    }
}

impl<A: TensorAllocator> std::fmt::Debug for BufferRegistry<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferRegistry")
            .field("len", &self.buffers.len())
            .field("next_handle", &self.next_handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imbridge_tensor::Ownership;

    #[test]
    fn test_register_vec_and_borrow() -> Result<(), CodecError> {
        let mut registry = BufferRegistry::new();
        let handle = registry.register_vec(vec![1u16, 2, 3])?;
        let reference = BufferRef::Address(handle);
        assert!(registry.contains(&reference));
        assert_eq!(registry.len(), 1);

        let lease = registry.borrow(&reference)?;
        assert_eq!(lease.buffer().component(), Some(ComponentTag::UInt16));
        assert_eq!(lease.buffer().byte_len(), 6);
        let storage = lease.storage::<u16>("data", 3, true)?;
        assert_eq!(storage.as_slice(), &[1, 2, 3]);
        assert_eq!(storage.ownership(), Ownership::Borrowed);
        Ok(())
    }

    #[test]
    fn test_register_raw_is_zero_copy() -> Result<(), CodecError> {
        let external = vec![1.5f32, 2.5];
        let mut registry = BufferRegistry::new();
        let handle = unsafe { registry.register_raw(external.as_ptr(), external.len())? };
        let storage = registry
            .borrow(&handle.into())?
            .storage::<f32>("data", 2, true)?;
        assert_eq!(storage.as_ptr(), external.as_ptr());
        Ok(())
    }

    #[test]
    fn test_register_storage_shares_block() -> Result<(), CodecError> {
        let owner = TensorStorage::<u8>::from_vec(vec![9, 8, 7], CpuAllocator)?;
        let mut registry = BufferRegistry::new();
        let handle = registry.register_storage(&owner);
        assert!(!owner.is_unique());
        let lease = registry.borrow(&handle.into())?;
        assert_eq!(lease.buffer().as_bytes(), &[9, 8, 7]);
        Ok(())
    }

    #[test]
    fn test_unknown_reference() {
        let registry = BufferRegistry::new();
        let reference = BufferRef::Address(BufferHandle(5));
        assert!(matches!(
            registry.borrow(&reference),
            Err(CodecError::UnknownBuffer(s)) if s == "data:application/vnd.itk.address,0:5"
        ));
    }

    #[test]
    fn test_handles_skip_producer_addresses() -> Result<(), CodecError> {
        let mut registry = BufferRegistry::new();
        let taken = RegisteredBuffer::from_vec(vec![0u8], CpuAllocator)?;
        registry.insert(BufferRef::Address(BufferHandle(1)), taken);
        let handle = registry.register_vec(vec![1u8])?;
        assert_eq!(handle, BufferHandle(2));
        assert_eq!(registry.len(), 2);
        Ok(())
    }

    #[test]
    fn test_release_keeps_leases_alive() -> Result<(), CodecError> {
        let mut registry = BufferRegistry::new();
        let handle = registry.register_vec(vec![4i32, 5])?;
        let reference = BufferRef::from(handle);
        let storage = registry.borrow(&reference)?.storage::<i32>("data", 2, true)?;
        registry.release(&reference)?;
        assert!(registry.is_empty());
        assert_eq!(storage.as_slice(), &[4, 5]);
        assert!(matches!(
            registry.release(&reference),
            Err(CodecError::UnknownBuffer(_))
        ));
        Ok(())
    }

    #[test]
    fn test_lease_type_and_size_checks() -> Result<(), CodecError> {
        let mut registry = BufferRegistry::new();
        let reference = BufferRef::from(registry.register_vec(vec![0u8; 4])?);
        let lease = registry.borrow(&reference)?;

        let res = lease.storage::<i8>("data", 4, true);
        assert!(matches!(
            res,
            Err(CodecError::BufferMismatch { ref expected, ref actual, .. })
                if expected == "int8" && actual == "uint8"
        ));
        assert!(lease.storage::<i8>("data", 4, false).is_ok());

        let res = lease.storage::<u8>("data", 5, true);
        assert!(matches!(
            res,
            Err(CodecError::BufferMismatch { ref expected, ref actual, .. })
                if expected == "5 bytes" && actual == "4 bytes"
        ));
        Ok(())
    }

    #[test]
    fn test_untyped_bytes() -> Result<(), CodecError> {
        let mut registry = BufferRegistry::new();
        let reference = BufferRef::Path("0.raw".into());
        let bytes = bytemuck::cast_slice::<f64, u8>(&[1.0, 0.0, 0.0, 1.0]).to_vec();
        registry.insert(reference.clone(), RegisteredBuffer::from_bytes(&bytes, CpuAllocator)?);
        let storage = registry.borrow(&reference)?.storage::<f64>("direction", 4, true)?;
        assert_eq!(storage.as_slice(), &[1.0, 0.0, 0.0, 1.0]);
        Ok(())
    }
}
