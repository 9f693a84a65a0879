/// A metadata value.
///
/// The set of kinds is closed: strings, integers, floats, and homogeneous
/// lists of each. An empty list carries no element kind and is always a
/// [`MetadataValue::FloatList`] once stored in a [`MetaDataDictionary`].
#[derive(Clone, Debug, PartialEq)]
pub enum MetadataValue {
    /// A string.
    String(String),
    /// A signed integer.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// An ordered list of strings.
    StringList(Vec<String>),
    /// An ordered list of integers.
    IntegerList(Vec<i64>),
    /// An ordered list of floating point numbers.
    FloatList(Vec<f64>),
}

impl MetadataValue {
    /// Returns a short name of the value kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::StringList(_) => "string list",
            Self::IntegerList(_) => "integer list",
            Self::FloatList(_) => "float list",
        }
    }

    /// Returns the string if this is a [`MetadataValue::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is a [`MetadataValue::Integer`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the number as a float for integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn canonical(self) -> Self {
        match self {
            Self::StringList(v) if v.is_empty() => Self::FloatList(Vec::new()),
            Self::IntegerList(v) if v.is_empty() => Self::FloatList(Vec::new()),
            other => other,
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for MetadataValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_value!(
    String => String,
    &str => String,
    i64 => Integer,
    i32 => Integer,
    u32 => Integer,
    f64 => Float,
    f32 => Float,
    Vec<String> => StringList,
    Vec<i64> => IntegerList,
    Vec<f64> => FloatList,
);

/// An ordered, string-keyed dictionary of metadata.
///
/// Iteration yields entries in insertion order. Replacing the value of an
/// existing key keeps its position. Empty lists of any kind are stored as an
/// empty [`MetadataValue::FloatList`].
///
/// # Examples
///
/// ```
/// use imbridge_image::{MetaDataDictionary, MetadataValue};
///
/// let mut dict = MetaDataDictionary::new();
/// dict.insert("b", 1);
/// dict.insert("a", "x");
/// dict.insert("b", 2);
///
/// let keys: Vec<_> = dict.keys().collect();
/// assert_eq!(keys, vec!["b", "a"]);
/// assert_eq!(dict.get("b"), Some(&MetadataValue::Integer(2)));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetaDataDictionary {
    entries: Vec<(String, MetadataValue)>,
}

impl MetaDataDictionary {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous value of the key if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Option<MetadataValue> {
        let key = key.into();
        let value = value.into().canonical();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Returns the value of `key`.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns true if the dictionary holds `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<MetadataValue>> FromIterator<(K, V)> for MetaDataDictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Self::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

impl IntoIterator for MetaDataDictionary {
    type Item = (String, MetadataValue);
    type IntoIter = std::vec::IntoIter<(String, MetadataValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
