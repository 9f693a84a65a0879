use std::{marker::PhantomData, str::FromStr};

use crate::{
    component::{ComponentType, FloatComponent},
    error::ImageError,
};

/// The structural kind of each pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelTag {
    /// One component per pixel.
    Scalar,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
    /// Integer index offset.
    Offset,
    /// Fixed-length vector.
    Vector,
    /// Point in physical space.
    Point,
    /// Covariant vector (e.g. a gradient).
    CovariantVector,
    /// Symmetric second rank tensor, upper triangle stored.
    SymmetricSecondRankTensor,
    /// 3×3 symmetric diffusion tensor.
    DiffusionTensor3D,
    /// Real and imaginary parts.
    Complex,
    /// Fixed-length array.
    FixedArray,
    /// Array whose length is set at run time.
    Array,
    /// Fixed-size matrix.
    Matrix,
    /// Vector whose length is set at run time.
    VariableLengthVector,
    /// Matrix whose size is set at run time.
    VariableSizeMatrix,
}

impl PixelTag {
    /// All pixel tags.
    pub const ALL: [PixelTag; 15] = [
        Self::Scalar,
        Self::Rgb,
        Self::Rgba,
        Self::Offset,
        Self::Vector,
        Self::Point,
        Self::CovariantVector,
        Self::SymmetricSecondRankTensor,
        Self::DiffusionTensor3D,
        Self::Complex,
        Self::FixedArray,
        Self::Array,
        Self::Matrix,
        Self::VariableLengthVector,
        Self::VariableSizeMatrix,
    ];

    /// Returns the canonical wire string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "Scalar",
            Self::Rgb => "RGB",
            Self::Rgba => "RGBA",
            Self::Offset => "Offset",
            Self::Vector => "Vector",
            Self::Point => "Point",
            Self::CovariantVector => "CovariantVector",
            Self::SymmetricSecondRankTensor => "SymmetricSecondRankTensor",
            Self::DiffusionTensor3D => "DiffusionTensor3D",
            Self::Complex => "Complex",
            Self::FixedArray => "FixedArray",
            Self::Array => "Array",
            Self::Matrix => "Matrix",
            Self::VariableLengthVector => "VariableLengthVector",
            Self::VariableSizeMatrix => "VariableSizeMatrix",
        }
    }

    /// Returns true if the per-pixel component count is only known at run time.
    pub const fn is_variable(self) -> bool {
        matches!(
            self,
            Self::Array | Self::VariableLengthVector | Self::VariableSizeMatrix
        )
    }
}

impl FromStr for PixelTag {
    type Err = ImageError;

    /// Parses a canonical tag. Matching is exact: no case folding, no aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ImageError::UnknownPixelTag(s.to_string()))
    }
}

impl std::fmt::Display for PixelTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A statically selected pixel type.
///
/// Implemented by the zero-sized markers of this module. `COMPONENTS == 0`
/// means the count is variable and supplied per image.
pub trait PixelType: Send + Sync + 'static {
    /// The component type of each element.
    type Component: ComponentType;

    /// The structural kind of the pixel.
    const TAG: PixelTag;

    /// Components per pixel, or 0 when variable.
    const COMPONENTS: usize;

    /// Returns true if an image of this pixel type may carry `count`
    /// components per pixel.
    fn accepts_components(count: usize) -> bool {
        Self::COMPONENTS == 0 || Self::COMPONENTS == count
    }
}

/// Number of buffer elements per pixel for a declared component count.
///
/// A count of zero is treated as one element.
#[inline]
pub fn elements_per_pixel(components: usize) -> usize {
    components.max(1)
}

/// Macro to define a pixel marker with a component type parameter.
macro_rules! define_pixel_type {
    ($(#[$doc:meta])* $name:ident<T: $bound:ident>, $tag:ident, $components:expr) => {
        $(#[$doc])*
        pub struct $name<T>(PhantomData<fn() -> T>);

        impl<T: $bound> PixelType for $name<T> {
            type Component = T;
            const TAG: PixelTag = PixelTag::$tag;
            const COMPONENTS: usize = $components;
        }
    };
    ($(#[$doc:meta])* $name:ident<T, const N>, $tag:ident, $components:expr) => {
        $(#[$doc])*
        pub struct $name<T, const N: usize>(PhantomData<fn() -> T>);

        impl<T: ComponentType, const N: usize> PixelType for $name<T, N> {
            type Component = T;
            const TAG: PixelTag = PixelTag::$tag;
            const COMPONENTS: usize = $components;
        }
    };
}

define_pixel_type!(
    /// A single component per pixel.
    Scalar<T: ComponentType>, Scalar, 1
);
define_pixel_type!(
    /// Three color components.
    Rgb<T: ComponentType>, Rgb, 3
);
define_pixel_type!(
    /// Four color components.
    Rgba<T: ComponentType>, Rgba, 4
);
define_pixel_type!(
    /// Fixed-length vector of `N` components.
    Vector<T, const N>, Vector, N
);
define_pixel_type!(
    /// Point with `N` coordinates.
    Point<T, const N>, Point, N
);
define_pixel_type!(
    /// Covariant vector of `N` components.
    CovariantVector<T, const N>, CovariantVector, N
);
define_pixel_type!(
    /// Fixed-length array of `N` components.
    FixedArray<T, const N>, FixedArray, N
);
define_pixel_type!(
    /// Symmetric `N`×`N` tensor storing its upper triangle.
    SymmetricSecondRankTensor<T, const N>, SymmetricSecondRankTensor, N * (N + 1) / 2
);
define_pixel_type!(
    /// 3×3 symmetric diffusion tensor.
    DiffusionTensor3D<T: ComponentType>, DiffusionTensor3D, 6
);
define_pixel_type!(
    /// Complex number with real and imaginary parts.
    Complex<T: FloatComponent>, Complex, 2
);
define_pixel_type!(
    /// Array with a per-image component count.
    Array<T: ComponentType>, Array, 0
);
define_pixel_type!(
    /// Vector with a per-image component count.
    VariableLengthVector<T: ComponentType>, VariableLengthVector, 0
);
define_pixel_type!(
    /// Matrix with a per-image component count.
    VariableSizeMatrix<T: ComponentType>, VariableSizeMatrix, 0
);

/// Integer offset with `N` signed 64-bit components.
pub struct Offset<const N: usize>;

impl<const N: usize> PixelType for Offset<N> {
    type Component = i64;
    const TAG: PixelTag = PixelTag::Offset;
    const COMPONENTS: usize = N;
}

/// Fixed-size `R`×`C` matrix stored row-major.
pub struct Matrix<T, const R: usize, const C: usize>(PhantomData<fn() -> T>);

impl<T: ComponentType, const R: usize, const C: usize> PixelType for Matrix<T, R, C> {
    type Component = T;
    const TAG: PixelTag = PixelTag::Matrix;
    const COMPONENTS: usize = R * C;
}
