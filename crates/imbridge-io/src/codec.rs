use imbridge_image::{Image, ImageSize, MetaDataDictionary, PixelType};
use imbridge_tensor::{CpuAllocator, TensorAllocator};

use crate::{
    buffer_ref::BufferRef,
    config::{CodecConfig, DirectionEncoding},
    descriptor::{Descriptor, DirectionSource, ImageTypeDescriptor},
    error::CodecError,
    geometry::decode_geometry,
    import::{import_pixels, validate_image_type},
    metadata::{json_to_metadata, metadata_to_json},
    registry::BufferRegistry,
};

/// Decodes image JSON into statically typed images.
///
/// Pixel data is resolved through the registry and imported without a copy.
///
/// # Examples
///
/// ```
/// use imbridge_image::{Image, Scalar};
/// use imbridge_io::{BufferRegistry, ImageDecoder};
///
/// let mut registry = BufferRegistry::new();
/// let handle = registry.register_vec(vec![1u8, 2, 3, 4]).unwrap();
/// let json = format!(
///     r#"{{"imageType": {{"dimension": 2, "componentType": "uint8", "pixelType": "Scalar", "components": 1}},
///         "origin": [0, 0], "spacing": [1, 1], "direction": [[1, 0], [0, 1]],
///         "size": [2, 2], "data": "data:application/vnd.itk.address,0:{}"}}"#,
///     handle.0
/// );
///
/// let image: Image<Scalar<u8>, 2> = ImageDecoder::new(&registry).decode(&json).unwrap();
/// assert_eq!(image.as_slice(), &[1, 2, 3, 4]);
/// ```
pub struct ImageDecoder<'a, A: TensorAllocator = CpuAllocator> {
    registry: &'a BufferRegistry<A>,
    config: CodecConfig,
}

impl<'a, A: TensorAllocator> ImageDecoder<'a, A> {
    /// Creates a decoder with the default config.
    pub fn new(registry: &'a BufferRegistry<A>) -> Self {
        Self {
            registry,
            config: CodecConfig::default(),
        }
    }

    /// Replaces the config.
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the config.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Parses JSON text and decodes it as an `Image<P, D, A>`.
    ///
    /// # Errors
    ///
    /// Any [`CodecError`]. No image is produced on failure.
    pub fn decode<P: PixelType, const D: usize>(
        &self,
        json: &str,
    ) -> Result<Image<P, D, A>, CodecError> {
        let descriptor = Descriptor::parse(json)?;
        self.decode_descriptor(&descriptor)
    }

    /// Decodes an already parsed descriptor.
    pub fn decode_descriptor<P: PixelType, const D: usize>(
        &self,
        descriptor: &Descriptor,
    ) -> Result<Image<P, D, A>, CodecError> {
        let verify = self.config.verify_buffer_types;
        let components = validate_image_type::<P, D>(&descriptor.image_type)?;
        let geometry = decode_geometry::<D, A>(descriptor, self.registry, verify)?;
        let storage = import_pixels::<P, D, A>(descriptor, self.registry, verify)?;

        let metadata = match &descriptor.metadata {
            Some(object) => json_to_metadata(object, self.config.metadata_policy)?,
            None => MetaDataDictionary::new(),
        };

        let size: [usize; D] = descriptor.size.as_slice().try_into().map_err(|_| {
            CodecError::schema(
                "size",
                format!("expected {D} entries, got {}", descriptor.size.len()),
            )
        })?;

        let mut image = Image::from_storage(ImageSize(size), components, storage)?
            .with_geometry(geometry)
            .with_metadata(metadata);
        if let Some(name) = &descriptor.name {
            image = image.with_name(name.as_str());
        }

        log::debug!(
            "decoded {} {}<{}> image of size {}",
            if image.name().is_empty() { "unnamed" } else { image.name() },
            P::TAG,
            image.component_tag(),
            image.size()
        );
        Ok(image)
    }
}

/// Encodes images into JSON, registering their buffers.
///
/// The pixel storage is registered without a copy, so the image memory
/// stays alive for as long as the registry entry exists.
pub struct ImageEncoder<'a, A: TensorAllocator = CpuAllocator> {
    registry: &'a mut BufferRegistry<A>,
    config: CodecConfig,
}

impl<'a, A: TensorAllocator> ImageEncoder<'a, A> {
    /// Creates an encoder with the default config.
    pub fn new(registry: &'a mut BufferRegistry<A>) -> Self {
        Self {
            registry,
            config: CodecConfig::default(),
        }
    }

    /// Replaces the config.
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the config.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encodes an image as compact JSON text.
    ///
    /// On failure, buffers registered for this image are released again.
    pub fn encode<P: PixelType, const D: usize>(
        &mut self,
        image: &Image<P, D, A>,
    ) -> Result<String, CodecError> {
        let descriptor = self.describe(image)?;
        descriptor.to_json_string().inspect_err(|_| {
            self.release(&descriptor);
        })
    }

    /// Registers the image buffers and builds its descriptor.
    pub fn describe<P: PixelType, const D: usize>(
        &mut self,
        image: &Image<P, D, A>,
    ) -> Result<Descriptor, CodecError> {
        let metadata = if image.metadata().is_empty() {
            None
        } else {
            Some(metadata_to_json(image.metadata())?)
        };

        let geometry = image.geometry();
        let direction = match self.config.direction_encoding {
            DirectionEncoding::Inline => DirectionSource::Inline(geometry.direction_row_major()),
            DirectionEncoding::Buffer => {
                let handle = self.registry.register_vec(geometry.direction_row_major())?;
                DirectionSource::Buffer(BufferRef::Address(handle))
            }
        };
        let data = BufferRef::Address(self.registry.register_storage(image.storage()));

        log::debug!(
            "encoded {}<{}> image of size {} as {data}",
            P::TAG,
            image.component_tag(),
            image.size()
        );

        Ok(Descriptor {
            image_type: ImageTypeDescriptor {
                dimension: D,
                component_type: image.component_tag(),
                pixel_type: P::TAG,
                components: Some(image.components()),
            },
            name: (!image.name().is_empty()).then(|| image.name().to_string()),
            origin: geometry.origin.to_vec(),
            spacing: geometry.spacing.to_vec(),
            direction,
            size: image.size().as_array().to_vec(),
            data,
            metadata,
        })
    }

    fn release(&mut self, descriptor: &Descriptor) {
        let direction = match &descriptor.direction {
            DirectionSource::Buffer(reference) => Some(reference),
            DirectionSource::Inline(_) => None,
        };
        for reference in direction.into_iter().chain([&descriptor.data]) {
            if let Err(e) = self.registry.release(reference) {
                log::warn!("could not release {reference} after a failed encode: {e}");
            }
        }
    }
}

/// Decodes image JSON with the default config.
pub fn decode_image<P: PixelType, const D: usize, A: TensorAllocator>(
    json: &str,
    registry: &BufferRegistry<A>,
) -> Result<Image<P, D, A>, CodecError> {
    ImageDecoder::new(registry).decode(json)
}

/// Encodes an image with the default config.
pub fn encode_image<P: PixelType, const D: usize, A: TensorAllocator>(
    image: &Image<P, D, A>,
    registry: &mut BufferRegistry<A>,
) -> Result<String, CodecError> {
    ImageEncoder::new(registry).encode(image)
}
