//! Attribute value types.
//!
//! Submitted payloads, whitelist literals and filtered output all share this
//! shape so a single recursion handles every one of them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Runtime representation of a submitted attribute value.
///
/// Numbers and booleans arriving as JSON are carried as [`AttrValue::Scalar`]
/// holding their JSON text, the same way form parameters arrive as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum AttrValue {
    /// Explicit null (e.g. a form clearing a field)
    Null,

    /// A single string value
    Scalar(String),

    /// Ordered sequence, the literal-array form of a to-many payload
    List(Vec<AttrValue>),

    /// Keyed values, either plain attributes or nested association rows
    Map(AttrMap),
}

impl AttrValue {
    /// Create a scalar value.
    pub fn scalar(value: impl Into<String>) -> Self {
        AttrValue::Scalar(value.into())
    }

    /// Whether filtering treats this value as a leaf.
    pub fn is_scalar(&self) -> bool {
        matches!(self, AttrValue::Null | AttrValue::Scalar(_))
    }

    /// Get the string if this is a Scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Get the elements if this is a List.
    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the map if this is a Map.
    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            AttrValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttrValue::Null => "null",
            AttrValue::Scalar(_) => "scalar",
            AttrValue::List(_) => "list",
            AttrValue::Map(_) => "map",
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Scalar(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Scalar(value)
    }
}

impl From<AttrMap> for AttrValue {
    fn from(value: AttrMap) -> Self {
        AttrValue::Map(value)
    }
}

impl From<Vec<AttrValue>> for AttrValue {
    fn from(value: Vec<AttrValue>) -> Self {
        AttrValue::List(value)
    }
}

impl From<JsonValue> for AttrValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => AttrValue::Null,
            JsonValue::Bool(b) => AttrValue::Scalar(b.to_string()),
            JsonValue::Number(n) => AttrValue::Scalar(n.to_string()),
            JsonValue::String(s) => AttrValue::Scalar(s),
            JsonValue::Array(items) => {
                AttrValue::List(items.into_iter().map(AttrValue::from).collect())
            }
            JsonValue::Object(map) => AttrValue::Map(
                map.into_iter()
                    .map(|(key, value)| (key, AttrValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<AttrValue> for JsonValue {
    fn from(value: AttrValue) -> Self {
        match value {
            AttrValue::Null => JsonValue::Null,
            AttrValue::Scalar(s) => JsonValue::String(s),
            AttrValue::List(items) => {
                JsonValue::Array(items.into_iter().map(JsonValue::from).collect())
            }
            AttrValue::Map(map) => JsonValue::Object(
                map.into_iter()
                    .map(|(key, value)| (key, JsonValue::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Insertion-ordered map from attribute name to value.
///
/// Inserting an existing key replaces the value in place, so the position of
/// the first occurrence wins. Lookups and inserts are constant time; equality
/// ignores order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrMap {
    entries: IndexMap<String, AttrValue>,
}

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert a value, returning the previous value for the key if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Option<AttrValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a key, keeping the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.entries.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, AttrValue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for AttrMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AttrMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for AttrMap {
    type Item = (String, AttrValue);
    type IntoIter = indexmap::map::IntoIter<String, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a AttrMap {
    type Item = (&'a String, &'a AttrValue);
    type IntoIter = indexmap::map::Iter<'a, String, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
