use std::marker::PhantomData;

use imbridge_tensor::{CpuAllocator, Ownership, TensorAllocator, TensorStorage};

use crate::{
    component::ComponentTag,
    error::ImageError,
    geometry::{ImageGeometry, ImageSize},
    metadata::MetaDataDictionary,
    pixel::{elements_per_pixel, PixelTag, PixelType},
};

/// An N-dimensional image with geometry, a typed pixel buffer and metadata.
///
/// The pixel type `P` and the dimension `D` are chosen at compile time. The
/// buffer holds `num_pixels() * max(components, 1)` elements of
/// `P::Component`, pixel components interleaved, axis 0 varying fastest.
///
/// The buffer may either be owned by the image or borrowed from an external
/// producer, see [`Image::ownership`].
pub struct Image<P: PixelType, const D: usize, A: TensorAllocator = CpuAllocator> {
    name: String,
    size: ImageSize<D>,
    components: usize,
    geometry: ImageGeometry<D>,
    storage: TensorStorage<P::Component, A>,
    metadata: MetaDataDictionary,
    _pixel: PhantomData<fn() -> P>,
}

impl<P: PixelType, const D: usize, A: TensorAllocator> Image<P, D, A> {
    /// Create a new image from pixel data with the component count of `P`.
    ///
    /// # Errors
    ///
    /// Fails if `P` has a variable component count, if a size entry is zero,
    /// or if the data length does not match the image size.
    ///
    /// # Examples
    ///
    /// ```
    /// use imbridge_image::{Image, ImageSize, Rgb};
    /// use imbridge_tensor::CpuAllocator;
    ///
    /// let image = Image::<Rgb<u8>, 2>::new(
    ///     ImageSize::from([10, 20]),
    ///     vec![0u8; 10 * 20 * 3],
    ///     CpuAllocator,
    /// ).unwrap();
    ///
    /// assert_eq!(image.size()[0], 10);
    /// assert_eq!(image.components(), 3);
    /// ```
    pub fn new(size: ImageSize<D>, data: Vec<P::Component>, alloc: A) -> Result<Self, ImageError> {
        if P::COMPONENTS == 0 {
            return Err(ImageError::ComponentCountRequired(P::TAG.as_str()));
        }
        Self::new_with_components(size, P::COMPONENTS, data, alloc)
    }

    /// Create a new image from pixel data with an explicit component count.
    ///
    /// Required for variable-length pixel types.
    pub fn new_with_components(
        size: ImageSize<D>,
        components: usize,
        data: Vec<P::Component>,
        alloc: A,
    ) -> Result<Self, ImageError> {
        Self::check_layout(size, components, data.len())?;
        let storage = TensorStorage::from_vec(data, alloc)?;
        Self::from_storage(size, components, storage)
    }

    /// Create a new image with every element set to `val`.
    pub fn from_size_val(size: ImageSize<D>, val: P::Component, alloc: A) -> Result<Self, ImageError> {
        if P::COMPONENTS == 0 {
            return Err(ImageError::ComponentCountRequired(P::TAG.as_str()));
        }
        let count = Self::element_count(size, P::COMPONENTS)?;
        Self::new(size, vec![val; count], alloc)
    }

    /// Create an image over existing storage without copying it.
    ///
    /// The image keeps the ownership recorded in `storage`.
    pub fn from_storage(
        size: ImageSize<D>,
        components: usize,
        storage: TensorStorage<P::Component, A>,
    ) -> Result<Self, ImageError> {
        Self::check_layout(size, components, storage.len())?;
        Ok(Self {
            name: String::new(),
            size,
            components,
            geometry: ImageGeometry::identity(),
            storage,
            metadata: MetaDataDictionary::new(),
            _pixel: PhantomData,
        })
    }

    fn check_layout(size: ImageSize<D>, components: usize, len: usize) -> Result<(), ImageError> {
        if !P::accepts_components(components) {
            return Err(ImageError::ComponentCountMismatch {
                pixel: P::TAG.as_str(),
                expected: P::COMPONENTS,
                actual: components,
            });
        }
        if let Some(axis) = size.zero_axis() {
            return Err(ImageError::ZeroSizedAxis(axis));
        }
        let expected = Self::element_count(size, components)?;
        if len != expected {
            return Err(ImageError::InvalidDataLength(len, expected));
        }
        Ok(())
    }

    fn element_count(size: ImageSize<D>, components: usize) -> Result<usize, ImageError> {
        size.checked_num_pixels()
            .and_then(|n| n.checked_mul(elements_per_pixel(components)))
            .ok_or_else(|| ImageError::SizeOverflow {
                size: size.as_array().to_vec(),
                components,
            })
    }

    /// Set the geometry.
    pub fn with_geometry(mut self, geometry: ImageGeometry<D>) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the metadata dictionary.
    pub fn with_metadata(mut self, metadata: MetaDataDictionary) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the name of the image.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the size of the image in pixels.
    pub fn size(&self) -> ImageSize<D> {
        self.size
    }

    /// Get the dimension of the image.
    pub fn dimension(&self) -> usize {
        D
    }

    /// Get the number of components per pixel.
    pub fn components(&self) -> usize {
        self.components
    }

    /// Get the number of pixels.
    pub fn num_pixels(&self) -> usize {
        self.size.num_pixels()
    }

    /// Get the component type tag.
    pub fn component_tag(&self) -> ComponentTag {
        <P::Component as crate::component::ComponentType>::TAG
    }

    /// Get the pixel type tag.
    pub fn pixel_tag(&self) -> PixelTag {
        P::TAG
    }

    /// Get the geometry.
    pub fn geometry(&self) -> &ImageGeometry<D> {
        &self.geometry
    }

    /// Get the metadata dictionary.
    pub fn metadata(&self) -> &MetaDataDictionary {
        &self.metadata
    }

    /// Get the metadata dictionary mutably.
    pub fn metadata_mut(&mut self) -> &mut MetaDataDictionary {
        &mut self.metadata
    }

    /// Get the pixel buffer storage.
    pub fn storage(&self) -> &TensorStorage<P::Component, A> {
        &self.storage
    }

    /// Returns whether the image owns or borrows its pixel buffer.
    pub fn ownership(&self) -> Ownership {
        self.storage.ownership()
    }

    /// Get the pixel data as a flat slice.
    pub fn as_slice(&self) -> &[P::Component] {
        self.storage.as_slice()
    }

    /// Get the components of the pixel at `index`.
    ///
    /// Returns `None` if the index is out of range.
    pub fn get_pixel(&self, index: [usize; D]) -> Option<&[P::Component]> {
        let n = elements_per_pixel(self.components);
        let offset = self.size.linear_index(index)? * n;
        self.as_slice().get(offset..offset + n)
    }

    /// Consume the image and return its storage.
    pub fn into_storage(self) -> TensorStorage<P::Component, A> {
        self.storage
    }
}

impl<P: PixelType, const D: usize, A: TensorAllocator> Clone for Image<P, D, A> {
    /// Clones the descriptors and shares the pixel buffer.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            size: self.size,
            components: self.components,
            geometry: self.geometry,
            storage: self.storage.clone(),
            metadata: self.metadata.clone(),
            _pixel: PhantomData,
        }
    }
}

impl<P: PixelType, const D: usize, A: TensorAllocator> std::fmt::Debug for Image<P, D, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("name", &self.name)
            .field("pixel_type", &P::TAG)
            .field("component_type", &self.component_tag())
            .field("size", &self.size)
            .field("components", &self.components)
            .field("geometry", &self.geometry)
            .field("ownership", &self.ownership())
            .field("metadata", &self.metadata)
            .finish()
    }
}
