#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `imbridge-tensor` provides the memory layer of the image codec: typed
//! storage that either owns its memory or borrows it from an external
//! producer, with the distinction visible in the type system through
//! [`Ownership`].
//!
//! # Quick Start
//!
//! ```rust
//! use imbridge_tensor::{CpuAllocator, Ownership, TensorStorage};
//!
//! let owned = TensorStorage::<u8>::from_vec(vec![1, 2, 3, 4], CpuAllocator).unwrap();
//! assert_eq!(owned.ownership(), Ownership::Owned);
//!
//! // zero-copy import of memory someone else manages
//! let external = vec![1.0f32, 2.0];
//! let view = unsafe { TensorStorage::<f32>::from_raw_parts(external.as_ptr(), 2) }.unwrap();
//! assert_eq!(view.ownership(), Ownership::Borrowed);
//! assert_eq!(view.as_ptr(), external.as_ptr());
//! ```

/// Allocator module containing memory management utilities.
///
/// This module provides the [`TensorAllocator`] trait and the default
/// [`CpuAllocator`] backed by the system allocator.
pub mod allocator;

/// Error types for storage operations.
pub mod error;

/// Type-erased memory blocks with explicit ownership.
pub mod memory;

/// Typed, reference-counted storage over memory blocks.
pub mod storage;

pub use crate::allocator::{CpuAllocator, TensorAllocator, TensorAllocatorError};
pub use crate::error::TensorError;
pub use crate::memory::{BorrowedView, MemoryBlock, OwnedBuffer, Ownership};
pub use crate::storage::TensorStorage;
