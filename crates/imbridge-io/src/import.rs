use imbridge_image::{ComponentTag, ComponentType, PixelTag, PixelType};
use imbridge_tensor::{TensorAllocator, TensorStorage};

use crate::{
    descriptor::{Descriptor, ImageTypeDescriptor},
    error::CodecError,
    registry::BufferRegistry,
};

/// Checks a component tag against the component type of `P`.
pub fn check_component_tag<P: PixelType>(actual: ComponentTag) -> Result<(), CodecError> {
    let expected = <P::Component as ComponentType>::TAG;
    if actual != expected {
        return Err(CodecError::type_mismatch(
            "imageType.componentType",
            expected,
            actual,
        ));
    }
    Ok(())
}

/// Checks a pixel tag against `P`.
pub fn check_pixel_tag<P: PixelType>(actual: PixelTag) -> Result<(), CodecError> {
    if actual != P::TAG {
        return Err(CodecError::type_mismatch("imageType.pixelType", P::TAG, actual));
    }
    Ok(())
}

/// Checks the `imageType` block against the static image type and returns
/// the per-pixel component count to use.
///
/// A fixed pixel type requires the declared count, when present, to equal
/// its own; an absent count means the static one. A variable pixel type
/// takes whatever the descriptor declares.
///
/// # Errors
///
/// [`CodecError::TypeMismatch`] naming the first field that disagrees.
pub fn validate_image_type<P: PixelType, const D: usize>(
    image_type: &ImageTypeDescriptor,
) -> Result<usize, CodecError> {
    if image_type.dimension != D {
        return Err(CodecError::type_mismatch(
            "imageType.dimension",
            D,
            image_type.dimension,
        ));
    }
    check_component_tag::<P>(image_type.component_type)?;
    check_pixel_tag::<P>(image_type.pixel_type)?;

    match (image_type.components, P::COMPONENTS) {
        (Some(declared), 0) => Ok(declared),
        (Some(declared), expected) if declared == expected => Ok(declared),
        (Some(declared), expected) => Err(CodecError::type_mismatch(
            "imageType.components",
            expected,
            declared,
        )),
        (None, 0) => Err(CodecError::schema(
            "imageType.components",
            format!("required for pixel type {}", P::TAG),
        )),
        (None, expected) => Ok(expected),
    }
}

/// Imports the pixel buffer of a descriptor without copying it.
///
/// The returned storage borrows the registered memory: it reports
/// [`Ownership::Borrowed`](imbridge_tensor::Ownership::Borrowed), never
/// frees it and refuses mutable access. Its length is
/// `product(size) * max(components, 1)` elements.
///
/// # Errors
///
/// - [`CodecError::TypeMismatch`] if the descriptor disagrees with `P` or `D`.
/// - [`CodecError::UnknownBuffer`] if `data` is not registered.
/// - [`CodecError::BufferMismatch`] if the registered buffer has another
///   element type (when `verify_types` is set) or is too small.
pub fn import_pixels<P: PixelType, const D: usize, A: TensorAllocator>(
    descriptor: &Descriptor,
    registry: &BufferRegistry<A>,
    verify_types: bool,
) -> Result<TensorStorage<P::Component, A>, CodecError> {
    let components = validate_image_type::<P, D>(&descriptor.image_type)?;
    let count = descriptor
        .element_count(components)
        .ok_or_else(|| CodecError::schema("size", "element count overflows"))?;

    let lease = registry.borrow(&descriptor.data)?;
    let storage = lease.storage::<P::Component>("data", count, verify_types)?;
    log::debug!(
        "imported {count} {} elements from {}",
        <P::Component as ComponentType>::TAG,
        descriptor.data
    );
    Ok(storage)
}
