/// An error type for the codec.
///
/// Every variant names the offending field and, where it applies, the
/// expected and actual values.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    /// The input is not valid JSON.
    #[error("Failed to parse the image JSON. {0}")]
    Parse(#[source] serde_json::Error),

    /// A required field is missing, has the wrong JSON type or the wrong length.
    #[error("Invalid field `{field}`: {reason}")]
    Schema {
        /// Dotted path of the field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The descriptor disagrees with the statically selected image type.
    #[error("Type mismatch for `{field}`: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Dotted path of the field.
        field: &'static str,
        /// Value required by the static image type.
        expected: String,
        /// Value found in the descriptor.
        actual: String,
    },

    /// A buffer reference string does not follow the wire convention.
    #[error("Malformed buffer reference {value:?}: {reason}")]
    MalformedBufferReference {
        /// The offending string.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A metadata value has no counterpart in the supported value kinds.
    #[error("Unsupported metadata value for key {key:?}: {kind}")]
    UnsupportedMetadataValue {
        /// Metadata key.
        key: String,
        /// Description of the JSON value shape.
        kind: String,
    },

    /// A value cannot be represented in JSON.
    #[error("Cannot serialize `{field}`: {reason}")]
    Serialization {
        /// Field or metadata key.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No buffer is registered under the reference.
    #[error("No buffer registered for {0}")]
    UnknownBuffer(String),

    /// A registered buffer is too small or of the wrong element type.
    #[error("Buffer for `{field}` does not match: expected {expected}, got {actual}")]
    BufferMismatch {
        /// Descriptor field that referenced the buffer.
        field: &'static str,
        /// What the descriptor requires.
        expected: String,
        /// What the registry holds.
        actual: String,
    },

    /// Error from the storage layer.
    #[error("Storage error. {0}")]
    Tensor(#[from] imbridge_tensor::TensorError),

    /// Error creating the image.
    #[error("Failed to create image. {0}")]
    Image(#[from] imbridge_image::ImageError),

    /// Error reading a file.
    #[error("Failed to manipulate the file. {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("Invalid configuration. {0}")]
    Config(String),
}

impl CodecError {
    /// Creates a Schema error.
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a TypeMismatch error.
    pub fn type_mismatch(
        field: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::TypeMismatch {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
