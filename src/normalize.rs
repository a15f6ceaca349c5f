//! Reduction of raw [`FieldValue`]s to [`NormalizedValue`]s.
//!
//! Each raw shape is handled by exactly one step of the chain below, checked in
//! this order: null, strings, mappings, date/times, durations, characters,
//! bytes, numbers and booleans, enumerated symbols, UUIDs, URIs, context
//! stacks, sequences, reflectable objects, and finally opaque values rendered
//! through `Display`.
//!
//! Reflectable objects may form cycles, so every recursion step counts depth
//! and fails with [`NormalizationError::DepthExceeded`] past the configured
//! limit.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeDelta};
use serde_json::Number;
use thiserror::Error;

use crate::value::{FieldValue, NormalizedValue, Reflectable, ValueMap};

/// Default nesting limit for normalised values.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Conventional key for injected type names.
pub const TYPE_KEY: &str = "$type";

/// Conventional key for injected string forms.
pub const STRING_KEY: &str = "$string";

/// Errors raised while normalising a value.
#[derive(Debug, Error)]
pub enum NormalizationError {
    /// The value graph is nested deeper than the configured limit.
    #[error("value nesting exceeds the maximum depth of {limit}")]
    DepthExceeded {
        /// The configured depth limit.
        limit: usize,
    },
    /// An opaque value could not be rendered as text.
    #[error("opaque value could not be rendered as text: {0}")]
    Fallback(String),
}

/// Format a timestamp as sortable, round-trippable RFC 3339 text.
pub fn format_timestamp(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Express a duration as a floating-point count of seconds.
pub fn duration_seconds(d: &TimeDelta) -> f64 {
    d.num_seconds() as f64 + f64::from(d.subsec_nanos()) / 1e9
}

/// Normalise `value` with default options.
pub fn normalize(value: &FieldValue, flatten: bool) -> Result<NormalizedValue, NormalizationError> {
    Normalizer::new().with_flatten(flatten).normalize(value)
}

/// Configurable value normaliser.
#[derive(Clone, Debug)]
pub struct Normalizer {
    flatten: bool,
    type_key: Option<String>,
    string_key: Option<String>,
    max_depth: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            flatten: false,
            type_key: None,
            string_key: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite nested mappings into dot-joined single-level keys.
    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    /// Inject each reflected object's type name under `key`.
    pub fn with_type_key(mut self, key: impl Into<String>) -> Self {
        self.type_key = Some(key.into());
        self
    }

    /// Inject each reflected object's string form under `key`.
    pub fn with_string_key(mut self, key: impl Into<String>) -> Self {
        self.string_key = Some(key.into());
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn flatten(&self) -> bool {
        self.flatten
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Normalise a single value.
    ///
    /// With flattening enabled a mapping result is rewritten into one level of
    /// dot-path keys; any other result is returned unchanged.
    pub fn normalize(&self, value: &FieldValue) -> Result<NormalizedValue, NormalizationError> {
        let normalized = self.normalize_at(value, 0)?;
        if self.flatten && let NormalizedValue::Map(map) = normalized {
            let mut flat = ValueMap::new();
            flatten_entries("", map, &mut flat);
            return Ok(NormalizedValue::Map(flat));
        }
        Ok(normalized)
    }

    /// Normalise `value` and store it in `out` under `key`.
    ///
    /// An empty `key` splices mapping entries directly into `out`. With
    /// flattening enabled nested entries land under `key.child` paths and
    /// null leaves are dropped.
    pub fn normalize_into(
        &self,
        key: &str,
        value: &FieldValue,
        out: &mut ValueMap,
    ) -> Result<(), NormalizationError> {
        let normalized = self.normalize_at(value, 0)?;
        if self.flatten {
            flatten_value(key, normalized, out);
            return Ok(());
        }
        match normalized {
            NormalizedValue::Map(map) if key.is_empty() => {
                for (k, v) in map {
                    out.insert(k, v);
                }
            }
            other => {
                out.insert(key, other);
            }
        }
        Ok(())
    }

    fn normalize_at(
        &self,
        value: &FieldValue,
        depth: usize,
    ) -> Result<NormalizedValue, NormalizationError> {
        if depth > self.max_depth {
            return Err(NormalizationError::DepthExceeded {
                limit: self.max_depth,
            });
        }
        let normalized = match value {
            FieldValue::Null => NormalizedValue::Null,
            FieldValue::String(s) => NormalizedValue::String(s.clone()),
            FieldValue::Map(entries) => {
                NormalizedValue::Map(self.normalize_entries(entries, depth)?)
            }
            FieldValue::DateTime(dt) => NormalizedValue::String(format_timestamp(dt)),
            FieldValue::Duration(d) => float_value(duration_seconds(d)),
            FieldValue::Char(c) => NormalizedValue::String(c.to_string()),
            FieldValue::Chars(chars) => NormalizedValue::String(chars.iter().collect()),
            FieldValue::Byte(b) => {
                NormalizedValue::String(String::from_utf8_lossy(&[*b]).into_owned())
            }
            FieldValue::Bytes(bytes) => {
                NormalizedValue::String(String::from_utf8_lossy(bytes).into_owned())
            }
            FieldValue::Int(n) => NormalizedValue::Number(Number::from(*n)),
            FieldValue::UInt(n) => NormalizedValue::Number(Number::from(*n)),
            FieldValue::Float(n) => float_value(*n),
            FieldValue::Bool(b) => NormalizedValue::Bool(*b),
            FieldValue::Enum(symbol) => NormalizedValue::String(symbol.clone()),
            FieldValue::Uuid(id) => NormalizedValue::String(id.hyphenated().to_string()),
            FieldValue::Uri(url) => NormalizedValue::String(url.as_str().to_owned()),
            FieldValue::Stack(items) => NormalizedValue::String(items.join(" ")),
            FieldValue::Seq(items) => NormalizedValue::Seq(
                items
                    .iter()
                    .map(|item| self.normalize_at(item, depth + 1))
                    .collect::<Result<_, _>>()?,
            ),
            FieldValue::Object(obj) => NormalizedValue::Map(self.reflect(obj.as_ref(), depth)?),
            FieldValue::Opaque(value) => {
                let mut text = String::new();
                write!(text, "{value}")
                    .map_err(|_| NormalizationError::Fallback(format!("{value:?}")))?;
                NormalizedValue::String(text)
            }
        };
        Ok(normalized)
    }

    fn normalize_entries(
        &self,
        entries: &[(String, FieldValue)],
        depth: usize,
    ) -> Result<ValueMap, NormalizationError> {
        let mut map = ValueMap::new();
        for (k, v) in entries {
            map.insert(k.as_str(), self.normalize_at(v, depth + 1)?);
        }
        Ok(map)
    }

    fn reflect(&self, obj: &dyn Reflectable, depth: usize) -> Result<ValueMap, NormalizationError> {
        let mut map = ValueMap::new();
        if let Some(key) = &self.type_key {
            map.insert(key.as_str(), NormalizedValue::String(obj.type_name().to_owned()));
        }
        for (k, v) in obj.fields() {
            map.insert(k, self.normalize_at(&v, depth + 1)?);
        }
        if let Some(key) = &self.string_key {
            map.insert(key.as_str(), NormalizedValue::String(obj.string_form()));
        }
        Ok(map)
    }
}

/// Non-finite floats have no JSON number form and are kept as text.
fn float_value(n: f64) -> NormalizedValue {
    Number::from_f64(n).map_or_else(
        || NormalizedValue::String(n.to_string()),
        NormalizedValue::Number,
    )
}

fn flatten_value(path: &str, value: NormalizedValue, out: &mut ValueMap) {
    match value {
        NormalizedValue::Map(map) => flatten_entries(path, map, out),
        NormalizedValue::Null => {}
        leaf => {
            out.insert(path, leaf);
        }
    }
}

fn flatten_entries(prefix: &str, map: ValueMap, out: &mut ValueMap) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        flatten_value(&path, value, out);
    }
}
