use imbridge_image::ImageGeometry;
use imbridge_tensor::TensorAllocator;

use crate::{
    descriptor::{Descriptor, DirectionSource},
    error::CodecError,
    registry::BufferRegistry,
};

/// Builds the geometry of a `D`-dimensional image from a descriptor.
///
/// A direction given by reference is resolved through `registry` as a
/// row-major block of `D * D` float64 values. There is no identity fallback:
/// an unresolvable or short direction is an error.
///
/// # Errors
///
/// - [`CodecError::TypeMismatch`] if the descriptor dimension is not `D`.
/// - [`CodecError::UnknownBuffer`] or [`CodecError::BufferMismatch`] if the
///   direction reference cannot be resolved to enough float64 values.
pub fn decode_geometry<const D: usize, A: TensorAllocator>(
    descriptor: &Descriptor,
    registry: &BufferRegistry<A>,
    verify_types: bool,
) -> Result<ImageGeometry<D>, CodecError> {
    if descriptor.image_type.dimension != D {
        return Err(CodecError::type_mismatch(
            "imageType.dimension",
            D,
            descriptor.image_type.dimension,
        ));
    }

    let origin = fixed::<D>(&descriptor.origin, "origin")?;
    let spacing = fixed::<D>(&descriptor.spacing, "spacing")?;

    let direction = match &descriptor.direction {
        DirectionSource::Inline(values) => ImageGeometry::<D>::direction_from_row_major(values)
            .map_err(|e| CodecError::schema("direction", e.to_string()))?,
        DirectionSource::Buffer(reference) => {
            log::trace!("resolving direction from {reference}");
            let storage = registry
                .borrow(reference)?
                .storage::<f64>("direction", D * D, verify_types)?;
            ImageGeometry::<D>::direction_from_row_major(storage.as_slice())?
        }
    };

    Ok(ImageGeometry {
        origin,
        spacing,
        direction,
    })
}

fn fixed<const D: usize>(values: &[f64], field: &str) -> Result<[f64; D], CodecError> {
    values.try_into().map_err(|_| {
        CodecError::schema(field, format!("expected {D} entries, got {}", values.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_ref::{BufferHandle, BufferRef};
    use approx::assert_relative_eq;

    fn descriptor(direction: &str) -> Result<Descriptor, CodecError> {
        Descriptor::parse(&format!(
            r#"{{
                "imageType": {{"dimension": 2, "componentType": "float32", "pixelType": "Scalar"}},
                "origin": [1.5, -2.0],
                "spacing": [0.5, 0.25],
                "direction": {direction},
                "size": [3, 4],
                "data": "data:application/vnd.itk.address,0:1"
            }}"#
        ))
    }

    #[test]
    fn test_inline_direction() -> Result<(), CodecError> {
        let d = descriptor("[[0, -1], [1, 0]]")?;
        let geometry = decode_geometry::<2, _>(&d, &BufferRegistry::new(), true)?;
        assert_relative_eq!(geometry.origin[0], 1.5);
        assert_relative_eq!(geometry.origin[1], -2.0);
        assert_relative_eq!(geometry.spacing[1], 0.25);
        assert_eq!(geometry.direction, [[0.0, -1.0], [1.0, 0.0]]);
        Ok(())
    }

    #[test]
    fn test_buffer_direction() -> Result<(), CodecError> {
        let mut registry = BufferRegistry::new();
        let handle = registry.register_vec(vec![0.0f64, 1.0, -1.0, 0.0])?;
        let d = descriptor(&format!("\"{}\"", BufferRef::from(handle)))?;
        let geometry = decode_geometry::<2, _>(&d, &registry, true)?;
        assert_eq!(geometry.direction, [[0.0, 1.0], [-1.0, 0.0]]);
        Ok(())
    }

    #[test]
    fn test_buffer_direction_errors() -> Result<(), CodecError> {
        let mut registry = BufferRegistry::new();
        let d = descriptor("\"data:application/vnd.itk.address,0:99\"")?;
        assert!(matches!(
            decode_geometry::<2, _>(&d, &registry, true),
            Err(CodecError::UnknownBuffer(_))
        ));

        registry.insert(
            BufferRef::Address(BufferHandle(99)),
            crate::registry::RegisteredBuffer::from_vec(vec![1.0f64, 0.0, 0.0], imbridge_tensor::CpuAllocator)?,
        );
        assert!(matches!(
            decode_geometry::<2, _>(&d, &registry, true),
            Err(CodecError::BufferMismatch { field: "direction", .. })
        ));

        registry.insert(
            BufferRef::Address(BufferHandle(99)),
            crate::registry::RegisteredBuffer::from_vec(vec![1.0f32, 0.0, 0.0, 1.0], imbridge_tensor::CpuAllocator)?,
        );
        assert!(matches!(
            decode_geometry::<2, _>(&d, &registry, true),
            Err(CodecError::BufferMismatch { field: "direction", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_dimension_mismatch() -> Result<(), CodecError> {
        let d = descriptor("[[1, 0], [0, 1]]")?;
        assert!(matches!(
            decode_geometry::<3, _>(&d, &BufferRegistry::new(), true),
            Err(CodecError::TypeMismatch { field: "imageType.dimension", .. })
        ));
        Ok(())
    }
}
