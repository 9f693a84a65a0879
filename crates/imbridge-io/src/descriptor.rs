//! The JSON image descriptor.
//!
//! ```json
//! {
//!   "imageType": { "dimension": 2, "componentType": "uint8", "pixelType": "Scalar", "components": 1 },
//!   "name": "optional",
//!   "origin": [0.0, 0.0],
//!   "spacing": [1.0, 1.0],
//!   "direction": [[1.0, 0.0], [0.0, 1.0]],
//!   "size": [2, 2],
//!   "data": "data:application/vnd.itk.address,0:1234567890",
//!   "metadata": { "key": "value" }
//! }
//! ```
//!
//! `direction` is either a buffer reference to a row-major block of
//! `dimension × dimension` float64 values, or an inline matrix given as rows
//! or as one flat row-major list.
//!
//! Parsing walks a [`serde_json::Value`] by hand so that every failure names
//! the exact field at fault.

use imbridge_image::{ComponentTag, PixelTag};
use serde_json::{Map, Number, Value};

use crate::{buffer_ref::BufferRef, error::CodecError};

/// The `imageType` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageTypeDescriptor {
    /// Number of axes.
    pub dimension: usize,
    /// Scalar type of each component.
    pub component_type: ComponentTag,
    /// Structural kind of each pixel.
    pub pixel_type: PixelTag,
    /// Components per pixel. Required for variable pixel types.
    pub components: Option<usize>,
}

/// Where the direction cosines live.
#[derive(Clone, Debug, PartialEq)]
pub enum DirectionSource {
    /// A row-major float64 block behind a buffer reference.
    Buffer(BufferRef),
    /// Row-major values given inline, `dimension * dimension` of them.
    Inline(Vec<f64>),
}

/// A parsed, schema-checked image descriptor.
///
/// All array fields hold exactly `image_type.dimension` entries. The
/// descriptor has not been checked against a static image type yet.
#[derive(Clone, Debug, PartialEq)]
pub struct Descriptor {
    /// The `imageType` block.
    pub image_type: ImageTypeDescriptor,
    /// Optional image name.
    pub name: Option<String>,
    /// Physical coordinate of the first pixel.
    pub origin: Vec<f64>,
    /// Distance between pixels along each axis.
    pub spacing: Vec<f64>,
    /// Direction cosines.
    pub direction: DirectionSource,
    /// Pixels along each axis, all positive.
    pub size: Vec<usize>,
    /// Reference to the pixel buffer.
    pub data: BufferRef,
    /// Raw metadata object, in document order.
    pub metadata: Option<Map<String, Value>>,
}

impl Descriptor {
    /// Parses descriptor JSON text.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Parse`] if the text is not JSON.
    /// - [`CodecError::Schema`] if a required field is missing, mistyped or
    ///   has the wrong number of entries.
    /// - [`CodecError::TypeMismatch`] if a tag string is not canonical.
    /// - [`CodecError::MalformedBufferReference`] for a bad `data` or
    ///   `direction` reference.
    pub fn parse(json: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(json).map_err(CodecError::Parse)?;
        Self::from_value(&value)
    }

    /// Builds a descriptor from an already parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self, CodecError> {
        let root = value
            .as_object()
            .ok_or_else(|| CodecError::schema("$", "expected an object"))?;

        let image_type = parse_image_type(required(root, "imageType", "imageType")?)?;
        let dimension = image_type.dimension;

        let name = match root.get("name") {
            None => None,
            Some(v) => Some(
                v.as_str()
                    .ok_or_else(|| CodecError::schema("name", "expected a string"))?
                    .to_string(),
            ),
        };

        let origin = float_array(required(root, "origin", "origin")?, "origin", dimension)?;
        let spacing = float_array(required(root, "spacing", "spacing")?, "spacing", dimension)?;
        let direction = parse_direction(required(root, "direction", "direction")?, dimension)?;
        let size = parse_size(required(root, "size", "size")?, dimension)?;

        let data = required(root, "data", "data")?
            .as_str()
            .ok_or_else(|| CodecError::schema("data", "expected a buffer reference string"))?;
        let data = BufferRef::decode(data)?;

        let metadata = match root.get("metadata") {
            None => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(_) => return Err(CodecError::schema("metadata", "expected an object")),
        };

        Ok(Self {
            image_type,
            name,
            origin,
            spacing,
            direction,
            size,
            data,
            metadata,
        })
    }

    /// Returns the number of elements of the pixel buffer:
    /// `product(size) * max(components, 1)`.
    pub fn element_count(&self, components: usize) -> Option<usize> {
        self.size
            .iter()
            .try_fold(1usize, |acc, &s| acc.checked_mul(s))?
            .checked_mul(components.max(1))
    }

    /// Serializes the descriptor to a JSON value.
    ///
    /// Keys are emitted in a fixed order, metadata keys in their own order.
    /// Inline directions are written as rows.
    ///
    /// # Errors
    ///
    /// [`CodecError::Serialization`] if a geometry value is not finite.
    pub fn to_json_value(&self) -> Result<Value, CodecError> {
        let mut image_type = Map::new();
        image_type.insert("dimension".into(), self.image_type.dimension.into());
        image_type.insert(
            "componentType".into(),
            self.image_type.component_type.as_str().into(),
        );
        image_type.insert("pixelType".into(), self.image_type.pixel_type.as_str().into());
        if let Some(components) = self.image_type.components {
            image_type.insert("components".into(), components.into());
        }

        let mut root = Map::new();
        root.insert("imageType".into(), Value::Object(image_type));
        if let Some(name) = &self.name {
            root.insert("name".into(), name.clone().into());
        }
        root.insert("origin".into(), finite_array(&self.origin, "origin")?);
        root.insert("spacing".into(), finite_array(&self.spacing, "spacing")?);

        let direction = match &self.direction {
            DirectionSource::Buffer(reference) => Value::String(reference.encode()),
            DirectionSource::Inline(values) => {
                let dimension = self.image_type.dimension.max(1);
                let rows = values
                    .chunks(dimension)
                    .map(|row| finite_array(row, "direction"))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::Array(rows)
            }
        };
        root.insert("direction".into(), direction);
        root.insert(
            "size".into(),
            Value::Array(self.size.iter().map(|&s| s.into()).collect()),
        );
        root.insert("data".into(), Value::String(self.data.encode()));
        if let Some(metadata) = &self.metadata {
            root.insert("metadata".into(), Value::Object(metadata.clone()));
        }
        Ok(Value::Object(root))
    }

    /// Serializes the descriptor to compact JSON text.
    pub fn to_json_string(&self) -> Result<String, CodecError> {
        let value = self.to_json_value()?;
        serde_json::to_string(&value).map_err(|e| CodecError::Serialization {
            field: "$".into(),
            reason: e.to_string(),
        })
    }
}

fn required<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value, CodecError> {
    obj.get(key)
        .ok_or_else(|| CodecError::schema(path, "missing required field"))
}

fn as_usize(value: &Value, path: &str) -> Result<usize, CodecError> {
    value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| CodecError::schema(path, format!("expected a non-negative integer, got {value}")))
}

fn parse_image_type(value: &Value) -> Result<ImageTypeDescriptor, CodecError> {
    let obj = value
        .as_object()
        .ok_or_else(|| CodecError::schema("imageType", "expected an object"))?;

    let dimension = as_usize(
        required(obj, "dimension", "imageType.dimension")?,
        "imageType.dimension",
    )?;
    if dimension == 0 {
        return Err(CodecError::schema("imageType.dimension", "must be positive"));
    }

    let component_type = required(obj, "componentType", "imageType.componentType")?
        .as_str()
        .ok_or_else(|| CodecError::schema("imageType.componentType", "expected a string"))?;
    let component_type = component_type.parse::<ComponentTag>().map_err(|_| {
        tag_mismatch(
            "imageType.componentType",
            component_type,
            ComponentTag::ALL.map(ComponentTag::as_str),
        )
    })?;

    let pixel_type = required(obj, "pixelType", "imageType.pixelType")?
        .as_str()
        .ok_or_else(|| CodecError::schema("imageType.pixelType", "expected a string"))?;
    let pixel_type = pixel_type.parse::<PixelTag>().map_err(|_| {
        tag_mismatch(
            "imageType.pixelType",
            pixel_type,
            PixelTag::ALL.map(PixelTag::as_str),
        )
    })?;

    let components = match obj.get("components") {
        None => None,
        Some(v) => Some(as_usize(v, "imageType.components")?),
    };
    if components.is_none() && pixel_type.is_variable() {
        return Err(CodecError::schema(
            "imageType.components",
            format!("required for pixel type {pixel_type}"),
        ));
    }

    Ok(ImageTypeDescriptor {
        dimension,
        component_type,
        pixel_type,
        components,
    })
}

/// A tag outside the closed set. The expected value is the canonical tag it
/// differs from only by case, or the whole set.
fn tag_mismatch<const N: usize>(
    field: &'static str,
    actual: &str,
    canonical: [&'static str; N],
) -> CodecError {
    let expected = match canonical.iter().find(|tag| tag.eq_ignore_ascii_case(actual)) {
        Some(tag) => (*tag).to_string(),
        None => format!("one of {}", canonical.join(", ")),
    };
    CodecError::TypeMismatch {
        field,
        expected,
        actual: actual.to_string(),
    }
}

fn array<'a>(value: &'a Value, field: &str, len: usize) -> Result<&'a Vec<Value>, CodecError> {
    let items = value
        .as_array()
        .ok_or_else(|| CodecError::schema(field, "expected an array"))?;
    if items.len() != len {
        return Err(CodecError::schema(
            field,
            format!("expected {len} entries, got {}", items.len()),
        ));
    }
    Ok(items)
}

fn float_array(value: &Value, field: &str, len: usize) -> Result<Vec<f64>, CodecError> {
    array(value, field, len)?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64()
                .ok_or_else(|| CodecError::schema(format!("{field}[{i}]"), "expected a number"))
        })
        .collect()
}

fn parse_size(value: &Value, dimension: usize) -> Result<Vec<usize>, CodecError> {
    array(value, "size", dimension)?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let field = format!("size[{i}]");
            match as_usize(v, &field)? {
                0 => Err(CodecError::schema(field, "must be positive")),
                s => Ok(s),
            }
        })
        .collect()
}

fn parse_direction(value: &Value, dimension: usize) -> Result<DirectionSource, CodecError> {
    match value {
        Value::String(s) => Ok(DirectionSource::Buffer(BufferRef::decode(s)?)),
        Value::Array(items) if items.first().is_some_and(Value::is_array) => {
            let rows = array(value, "direction", dimension)?;
            let mut values = Vec::with_capacity(dimension * dimension);
            for (i, row) in rows.iter().enumerate() {
                values.extend(float_array(row, &format!("direction[{i}]"), dimension)?);
            }
            Ok(DirectionSource::Inline(values))
        }
        Value::Array(_) => Ok(DirectionSource::Inline(float_array(
            value,
            "direction",
            dimension * dimension,
        )?)),
        _ => Err(CodecError::schema(
            "direction",
            "expected a buffer reference string or a matrix",
        )),
    }
}

fn finite_array(values: &[f64], field: &str) -> Result<Value, CodecError> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            Number::from_f64(v).map(Value::Number).ok_or_else(|| CodecError::Serialization {
                field: format!("{field}[{i}]"),
                reason: format!("{v} has no JSON representation"),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}
