//! Canonical JSON-safe values produced by the normalizer.

use std::collections::HashMap;

use delegate::delegate;
use serde::Serialize;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

/// The closed JSON-safe union every raw value is reduced to.
#[derive(Clone, Debug, PartialEq)]
pub enum NormalizedValue {
    Null,
    String(String),
    Number(Number),
    Bool(bool),
    Map(ValueMap),
    Seq(Vec<NormalizedValue>),
}

impl NormalizedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for NormalizedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for NormalizedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for NormalizedValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<bool> for NormalizedValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<ValueMap> for NormalizedValue {
    fn from(value: ValueMap) -> Self {
        Self::Map(value)
    }
}

/// Insertion-ordered string-keyed mapping.
///
/// Key order is the serialisation order. Inserting a key that is already
/// present replaces its value without moving it. Lookups go through a
/// key-to-position index.
#[derive(Clone, Debug, Default)]
pub struct ValueMap {
    entries: Vec<(String, NormalizedValue)>,
    index: HashMap<String, usize>,
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    delegate! {
        to self.entries {
            /// Number of entries in the mapping.
            pub fn len(&self) -> usize;
            pub fn is_empty(&self) -> bool;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Insert `value` under `key`, returning the value it replaced.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: NormalizedValue,
    ) -> Option<NormalizedValue> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&NormalizedValue> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NormalizedValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl IntoIterator for ValueMap {
    type Item = (String, NormalizedValue);
    type IntoIter = std::vec::IntoIter<(String, NormalizedValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, NormalizedValue)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, NormalizedValue)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for ValueMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Serialize for NormalizedValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => n.serialize(serializer),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Map(map) => map.serialize(serializer),
            Self::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}
