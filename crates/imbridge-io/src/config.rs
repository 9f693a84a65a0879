use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// What to do with metadata values that have no dictionary counterpart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataPolicy {
    /// Fail the conversion.
    #[default]
    Reject,
    /// Drop the entry with a warning.
    Skip,
    /// Keep the entry as its JSON text.
    Stringify,
}

/// How the encoder writes the direction matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionEncoding {
    /// Register a row-major float64 block and write its reference.
    #[default]
    Buffer,
    /// Write the matrix inline as rows.
    Inline,
}

/// Codec options.
///
/// Every field has a default, so a config file only needs the fields it
/// changes:
///
/// ```json
/// { "metadata_policy": "skip", "direction_encoding": "inline" }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Handling of unsupported metadata values.
    pub metadata_policy: MetadataPolicy,
    /// Encoding of the direction matrix.
    pub direction_encoding: DirectionEncoding,
    /// Check the element type recorded with a registered buffer.
    pub verify_buffer_types: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            metadata_policy: MetadataPolicy::default(),
            direction_encoding: DirectionEncoding::default(),
            verify_buffer_types: true,
        }
    }
}

impl CodecConfig {
    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// [`CodecError::Io`] if the file cannot be read, [`CodecError::Config`]
    /// if its content is not a valid config.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let path = path.as_ref();
        log::debug!("loading codec config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses a JSON config.
    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        serde_json::from_str(text).map_err(|e| CodecError::Config(e.to_string()))
    }

    /// Sets the metadata policy.
    pub fn with_metadata_policy(mut self, policy: MetadataPolicy) -> Self {
        self.metadata_policy = policy;
        self
    }

    /// Sets the direction encoding.
    pub fn with_direction_encoding(mut self, encoding: DirectionEncoding) -> Self {
        self.direction_encoding = encoding;
        self
    }

    /// Enables or disables the element type check of registered buffers.
    pub fn with_verify_buffer_types(mut self, verify: bool) -> Self {
        self.verify_buffer_types = verify;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() -> Result<(), CodecError> {
        let config = CodecConfig::from_json("{}")?;
        assert_eq!(config, CodecConfig::default());
        assert_eq!(config.metadata_policy, MetadataPolicy::Reject);
        assert_eq!(config.direction_encoding, DirectionEncoding::Buffer);
        assert!(config.verify_buffer_types);
        Ok(())
    }

    #[test]
    fn test_partial_config() -> Result<(), CodecError> {
        let config = CodecConfig::from_json(r#"{"metadata_policy": "stringify"}"#)?;
        assert_eq!(
            config,
            CodecConfig::default().with_metadata_policy(MetadataPolicy::Stringify)
        );
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            CodecConfig::from_json(r#"{"metadata_policy": "ignore"}"#),
            Err(CodecError::Config(_))
        ));
        assert!(matches!(
            CodecConfig::from_json(r#"{"verify": false}"#),
            Err(CodecError::Config(_))
        ));
    }
}
