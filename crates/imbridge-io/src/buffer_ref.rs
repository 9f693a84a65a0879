//! The string convention used to reference binary buffers from JSON.
//!
//! A reference is a fixed 35-character prefix followed by either a decimal
//! buffer handle or a path:
//!
//! ```text
//! data:application/vnd.itk.address,0:1234567890
//! data:application/vnd.itk.path,data/0.raw
//! ```
//!
//! Decoding only interprets the string. Whether a buffer actually exists
//! under the reference is answered by the
//! [`BufferRegistry`](crate::registry::BufferRegistry).

use std::{fmt, path::Path, str::FromStr};

use crate::error::CodecError;

/// Prefix of an address reference. Compatibility constant, must match producers byte for byte.
pub const ADDRESS_PREFIX: &str = "data:application/vnd.itk.address,0:";

/// Prefix of a path reference. Compatibility constant, must match producers byte for byte.
pub const PATH_PREFIX: &str = "data:application/vnd.itk.path,data/";

/// Length shared by both prefixes.
pub const PREFIX_LEN: usize = 35;

const _: () = assert!(ADDRESS_PREFIX.len() == PREFIX_LEN);
const _: () = assert!(PATH_PREFIX.len() == PREFIX_LEN);

/// Opaque identifier of a registered buffer.
///
/// On the wire this is the decimal payload of an address reference. It is
/// never turned into a pointer; it only keys the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A wire-level reference to externally-owned memory.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BufferRef {
    /// A buffer identified by a numeric handle.
    Address(BufferHandle),
    /// A buffer identified by a path relative to the `data/` directory.
    Path(String),
}

impl BufferRef {
    /// Decodes a reference string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedBufferReference`] if the prefix is not
    /// one of the two known prefixes, or if the payload is empty, not
    /// decimal, or does not fit in 64 bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use imbridge_io::buffer_ref::{BufferHandle, BufferRef};
    ///
    /// let r = BufferRef::decode("data:application/vnd.itk.address,0:1234567890").unwrap();
    /// assert_eq!(r, BufferRef::Address(BufferHandle(1234567890)));
    /// assert_eq!(r.encode(), "data:application/vnd.itk.address,0:1234567890");
    /// ```
    pub fn decode(value: &str) -> Result<Self, CodecError> {
        let malformed = |reason| CodecError::MalformedBufferReference {
            value: value.to_string(),
            reason,
        };

        if let Some(payload) = value.strip_prefix(ADDRESS_PREFIX) {
            if payload.is_empty() {
                return Err(malformed("empty address"));
            }
            if !payload.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed("address is not a decimal integer"));
            }
            let handle = payload
                .parse::<u64>()
                .map_err(|_| malformed("address does not fit in 64 bits"))?;
            return Ok(Self::Address(BufferHandle(handle)));
        }

        if let Some(payload) = value.strip_prefix(PATH_PREFIX) {
            if payload.is_empty() {
                return Err(malformed("empty path"));
            }
            return Ok(Self::Path(payload.to_string()));
        }

        Err(malformed("unknown prefix"))
    }

    /// Encodes the reference, the exact inverse of [`BufferRef::decode`].
    pub fn encode(&self) -> String {
        match self {
            Self::Address(handle) => format!("{ADDRESS_PREFIX}{handle}"),
            Self::Path(path) => format!("{PATH_PREFIX}{path}"),
        }
    }

    /// Returns the path if this is a path reference.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(p) => Some(Path::new(p)),
            Self::Address(_) => None,
        }
    }
}

impl From<BufferHandle> for BufferRef {
    fn from(handle: BufferHandle) -> Self {
        Self::Address(handle)
    }
}

impl fmt::Display for BufferRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for BufferRef {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl serde::Serialize for BufferRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> serde::Deserialize<'de> for BufferRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}
