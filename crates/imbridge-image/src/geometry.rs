use crate::error::ImageError;

/// Image size in pixels along each of the `D` axes.
///
/// Axis 0 varies fastest in the pixel buffer.
///
/// # Examples
///
/// ```
/// use imbridge_image::ImageSize;
///
/// let size = ImageSize::from([4, 3]);
/// assert_eq!(size.num_pixels(), 12);
/// assert_eq!(size[1], 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize<const D: usize>(pub [usize; D]);

impl<const D: usize> ImageSize<D> {
    /// Returns the number of pixels, the product of all entries.
    ///
    /// Saturates at `usize::MAX`; see [`ImageSize::checked_num_pixels`].
    pub fn num_pixels(&self) -> usize {
        self.checked_num_pixels().unwrap_or(usize::MAX)
    }

    /// Returns the number of pixels, or `None` if the product overflows.
    pub fn checked_num_pixels(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &s| acc.checked_mul(s))
    }

    /// Returns the entries as an array.
    pub fn as_array(&self) -> [usize; D] {
        self.0
    }

    /// Returns the first axis with a zero entry, if any.
    pub fn zero_axis(&self) -> Option<usize> {
        self.0.iter().position(|&s| s == 0)
    }

    /// Returns the buffer offset of `index` in pixels, or `None` if out of range
    /// or if the offset does not fit in `usize`.
    pub fn linear_index(&self, index: [usize; D]) -> Option<usize> {
        let mut offset = 0;
        let mut stride = 1;
        for (i, s) in index.iter().zip(self.0.iter()) {
            if i >= s {
                return None;
            }
            offset = i.checked_mul(stride)?.checked_add(offset)?;
            stride = stride.checked_mul(*s)?;
        }
        Some(offset)
    }
}

impl<const D: usize> From<[usize; D]> for ImageSize<D> {
    fn from(size: [usize; D]) -> Self {
        Self(size)
    }
}

impl<const D: usize> std::ops::Index<usize> for ImageSize<D> {
    type Output = usize;

    fn index(&self, axis: usize) -> &usize {
        &self.0[axis]
    }
}

impl<const D: usize> std::fmt::Display for ImageSize<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let parts = self.0.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        write!(f, "ImageSize {{ {} }}", parts.join(" x "))
    }
}

/// Physical placement of an image: origin, spacing and direction cosines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageGeometry<const D: usize> {
    /// Physical coordinate of the first pixel.
    pub origin: [f64; D],
    /// Physical distance between adjacent pixels along each axis.
    pub spacing: [f64; D],
    /// Direction cosines, `direction[row][col]`.
    pub direction: [[f64; D]; D],
}

impl<const D: usize> ImageGeometry<D> {
    /// Zero origin, unit spacing and identity direction.
    pub fn identity() -> Self {
        let mut direction = [[0.0; D]; D];
        for (i, row) in direction.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self {
            origin: [0.0; D],
            spacing: [1.0; D],
            direction,
        }
    }

    /// Builds the direction from a row-major slice of `D * D` values.
    pub fn direction_from_row_major(values: &[f64]) -> Result<[[f64; D]; D], ImageError> {
        if values.len() != D * D {
            return Err(ImageError::InvalidDirection {
                expected: D * D,
                actual: values.len(),
            });
        }
        let mut direction = [[0.0; D]; D];
        for (row, chunk) in direction.iter_mut().zip(values.chunks_exact(D)) {
            row.copy_from_slice(chunk);
        }
        Ok(direction)
    }

    /// Returns the direction flattened in row-major order.
    pub fn direction_row_major(&self) -> Vec<f64> {
        self.direction.iter().flatten().copied().collect()
    }

    /// Maps a continuous index to physical space:
    /// `origin + direction * (spacing ⊙ index)`.
    pub fn index_to_physical(&self, index: [f64; D]) -> [f64; D] {
        let mut point = self.origin;
        for (row, p) in self.direction.iter().zip(point.iter_mut()) {
            for (col, d) in row.iter().enumerate() {
                *p += d * self.spacing[col] * index[col];
            }
        }
        point
    }
}

impl<const D: usize> Default for ImageGeometry<D> {
    fn default() -> Self {
        Self::identity()
    }
}
