use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Keys starting with this character carry metadata (as in ARB files) and are
/// copied verbatim, never translated.
pub const METADATA_MARKER: char = '@';

pub fn is_metadata_key(key: &str) -> bool {
    key.starts_with(METADATA_MARKER)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document root must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// A value in a locale document.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Translatable text.
    Leaf(String),
    /// A nested group of entries.
    Subtree(Document),
    /// Any other JSON value (numbers, booleans, null, arrays), kept as is.
    Passthrough(Value),
}

impl Entry {
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Entry::Leaf(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_subtree(&self) -> Option<&Document> {
        match self {
            Entry::Subtree(document) => Some(document),
            _ => None,
        }
    }
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Entry::Leaf(text),
            Value::Object(map) => Entry::Subtree(Document::from_map(map)),
            other => Entry::Passthrough(other),
        }
    }
}

impl From<Entry> for Value {
    fn from(entry: Entry) -> Self {
        match entry {
            Entry::Leaf(text) => Value::String(text),
            Entry::Subtree(document) => document.into_value(),
            Entry::Passthrough(value) => value,
        }
    }
}

impl From<&str> for Entry {
    fn from(text: &str) -> Self {
        Entry::Leaf(text.to_string())
    }
}

impl From<Document> for Entry {
    fn from(document: Document) -> Self {
        Entry::Subtree(document)
    }
}

/// A tree of translatable strings keyed by message id.
///
/// Keys are kept sorted so serialised documents are stable between runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document(BTreeMap<String, Entry>);

impl Document {
    pub fn new() -> Self {
        Document(BTreeMap::new())
    }

    fn from_map(map: Map<String, Value>) -> Self {
        Document(
            map.into_iter()
                .map(|(key, value)| (key, Entry::from(value)))
                .collect(),
        )
    }

    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            Value::Null => Err(DocumentError::NotAnObject("null")),
            Value::Bool(_) => Err(DocumentError::NotAnObject("a boolean")),
            Value::Number(_) => Err(DocumentError::NotAnObject("a number")),
            Value::String(_) => Err(DocumentError::NotAnObject("a string")),
            Value::Array(_) => Err(DocumentError::NotAnObject("an array")),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(
            self.0
                .into_iter()
                .map(|(key, entry)| (key, Value::from(entry)))
                .collect(),
        )
    }

    pub fn to_value(&self) -> Value {
        self.clone().into_value()
    }

    pub fn with_entry(mut self, key: &str, entry: impl Into<Entry>) -> Self {
        self.insert(key, entry);
        self
    }

    pub fn insert(&mut self, key: &str, entry: impl Into<Entry>) -> Option<Entry> {
        self.0.insert(key.to_string(), entry.into())
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Entry> {
        self.0.iter()
    }

    /// Number of translatable leaves in the whole tree, metadata excluded.
    pub fn leaf_count(&self) -> usize {
        self.0
            .iter()
            .filter(|(key, _)| !is_metadata_key(key))
            .map(|(_, entry)| match entry {
                Entry::Leaf(_) => 1,
                Entry::Subtree(document) => document.leaf_count(),
                Entry::Passthrough(_) => 0,
            })
            .sum()
    }
}

impl FromIterator<(String, Entry)> for Document {
    fn from_iter<T: IntoIterator<Item = (String, Entry)>>(iter: T) -> Self {
        Document(iter.into_iter().collect())
    }
}

impl IntoIterator for Document {
    type Item = (String, Entry);
    type IntoIter = btree_map::IntoIter<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Entry);
    type IntoIter = btree_map::Iter<'a, String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Document::from_value(value).map_err(serde::de::Error::custom)
    }
}
