#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Component type tags and the [`ComponentType`] trait.
pub mod component;

/// Error types for the image module.
pub mod error;

/// Image size and physical geometry.
pub mod geometry;

/// image representation with a statically selected pixel type.
pub mod image;

/// Ordered metadata dictionary.
pub mod metadata;

/// Pixel type tags and zero-sized pixel type markers.
pub mod pixel;

pub use crate::component::{ComponentTag, ComponentType, FloatComponent};
pub use crate::error::ImageError;
pub use crate::geometry::{ImageGeometry, ImageSize};
pub use crate::image::Image;
pub use crate::metadata::{MetaDataDictionary, MetadataValue};
pub use crate::pixel::{
    elements_per_pixel, Array, Complex, CovariantVector, DiffusionTensor3D, FixedArray, Matrix,
    Offset, PixelTag, PixelType, Point, Rgb, Rgba, Scalar, SymmetricSecondRankTensor,
    VariableLengthVector, VariableSizeMatrix, Vector,
};
