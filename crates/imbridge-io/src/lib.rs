#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Buffer reference strings.
///
/// Encode and decode the `data:application/vnd.itk.*` references embedded in
/// descriptors. See [`buffer_ref::BufferRef`].
pub mod buffer_ref;

/// High-level image decoding and encoding.
///
/// See [`codec::ImageDecoder`] and [`codec::ImageEncoder`].
pub mod codec;

/// Codec options and config files.
pub mod config;

/// Parsing and serialization of image descriptors.
pub mod descriptor;

/// Error types for the codec.
pub mod error;

/// Geometry decoding.
pub mod geometry;

/// Validation of the image type and zero-copy pixel import.
pub mod import;

/// Metadata conversion between JSON and [`imbridge_image::MetaDataDictionary`].
pub mod metadata;

/// Registry mapping buffer references to live memory.
///
/// Replaces the raw addresses of the wire format with handles that can only
/// resolve to memory handed to the registry.
pub mod registry;

pub use crate::buffer_ref::{BufferHandle, BufferRef};
pub use crate::codec::{decode_image, encode_image, ImageDecoder, ImageEncoder};
pub use crate::config::{CodecConfig, DirectionEncoding, MetadataPolicy};
pub use crate::descriptor::{Descriptor, DirectionSource, ImageTypeDescriptor};
pub use crate::error::CodecError;
pub use crate::registry::{BufferLease, BufferRegistry, RegisteredBuffer};
