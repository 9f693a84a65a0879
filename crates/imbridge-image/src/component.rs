use std::str::FromStr;

use crate::error::ImageError;

/// The scalar element type composing a pixel.
///
/// Each variant has exactly one canonical wire string, see [`ComponentTag::as_str`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentTag {
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit IEEE float.
    Float32,
    /// 64-bit IEEE float.
    Float64,
}

impl ComponentTag {
    /// All component tags.
    pub const ALL: [ComponentTag; 10] = [
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
    ];

    /// Returns the canonical wire string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Returns the size of one component in bytes.
    pub const fn size_of(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Returns true for the floating point tags.
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

impl FromStr for ComponentTag {
    type Err = ImageError;

    /// Parses a canonical tag. Matching is exact: no case folding, no aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ImageError::UnknownComponentTag(s.to_string()))
    }
}

impl std::fmt::Display for ComponentTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A primitive type that can be stored as a pixel component.
///
/// Only types listed in [`ComponentTag`] implement this trait, so an image
/// over an unmapped element type does not compile.
pub trait ComponentType: bytemuck::Pod + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// The tag of this component type.
    const TAG: ComponentTag;
}

/// Component types valid for complex pixels.
pub trait FloatComponent: ComponentType {}

macro_rules! impl_component_type {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl ComponentType for $ty {
                const TAG: ComponentTag = ComponentTag::$tag;
            }
        )*
    };
}

impl_component_type!(
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);

impl FloatComponent for f32 {}
impl FloatComponent for f64 {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_tag_roundtrip() -> Result<(), ImageError> {
        for tag in ComponentTag::ALL {
            assert_eq!(tag.as_str().parse::<ComponentTag>()?, tag);
        }
        Ok(())
    }

    #[test]
    fn test_component_tag_exact_match() {
        for alias in ["Float", "FLOAT32", "float", "uint8_t", "UInt8", " uint8", ""] {
            assert_eq!(
                alias.parse::<ComponentTag>(),
                Err(ImageError::UnknownComponentTag(alias.to_string()))
            );
        }
    }

    #[test]
    fn test_component_type_tags() {
        assert_eq!(<u8 as ComponentType>::TAG, ComponentTag::UInt8);
        assert_eq!(<i64 as ComponentType>::TAG, ComponentTag::Int64);
        assert_eq!(<f32 as ComponentType>::TAG.as_str(), "float32");
        for tag in ComponentTag::ALL {
            assert!(tag.size_of() > 0);
        }
        assert_eq!(ComponentTag::Float64.size_of(), std::mem::size_of::<f64>());
    }
}
