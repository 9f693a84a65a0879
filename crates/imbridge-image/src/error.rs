use imbridge_tensor::TensorError;

/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// The buffer length does not match size × components.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidDataLength(usize, usize),

    /// A size entry is zero.
    #[error("Image size along axis {0} is zero")]
    ZeroSizedAxis(usize),

    /// The per-pixel component count disagrees with the pixel type.
    #[error("Pixel type {pixel} expects {expected} components per pixel, got {actual}")]
    ComponentCountMismatch {
        /// Canonical tag of the pixel type.
        pixel: &'static str,
        /// Components fixed by the pixel type.
        expected: usize,
        /// Components that were provided.
        actual: usize,
    },

    /// The number of buffer elements does not fit in `usize`.
    #[error("Image size {size:?} with {components} components per pixel overflows usize")]
    SizeOverflow {
        /// Pixels along each axis.
        size: Vec<usize>,
        /// Components per pixel.
        components: usize,
    },

    /// A variable-length pixel type was created without a component count.
    #[error("Pixel type {0} has a variable component count; use new_with_components")]
    ComponentCountRequired(&'static str),

    /// The string is not a canonical component type tag.
    #[error("Unknown component type tag {0:?}")]
    UnknownComponentTag(String),

    /// The string is not a canonical pixel type tag.
    #[error("Unknown pixel type tag {0:?}")]
    UnknownPixelTag(String),

    /// The direction data does not hold dimension × dimension entries.
    #[error("Direction matrix needs {expected} entries, got {actual}")]
    InvalidDirection {
        /// dimension × dimension
        expected: usize,
        /// Entries provided.
        actual: usize,
    },

    /// Error from the storage layer.
    #[error(transparent)]
    TensorError(#[from] TensorError),
}
