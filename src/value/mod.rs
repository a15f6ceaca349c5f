//! Raw and normalized value representations.
//!
//! [`FieldValue`] is the closed set of in-memory shapes a conversion or event
//! property may yield. The normalizer reduces it to a [`NormalizedValue`],
//! which the encoder renders as JSON.
//!
//! Arbitrary objects take part through the [`Reflectable`] trait rather than
//! runtime introspection: a type lists its own readable fields in order.
//! Anything else can still be logged as [`FieldValue::Opaque`], which falls
//! back to its `Display` text.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone};
use url::Url;
use uuid::Uuid;

mod normalized;

pub use normalized::{NormalizedValue, ValueMap};

/// A type that exposes its readable fields for structured logging.
///
/// Implementations list fields in the order they should be serialised.
pub trait Reflectable: fmt::Debug + Send + Sync {
    /// Name reported under the type key when type injection is enabled.
    fn type_name(&self) -> &str;

    /// Ordered public fields of the value.
    fn fields(&self) -> Vec<(String, FieldValue)>;

    /// Text reported under the string key when string injection is enabled.
    fn string_form(&self) -> String {
        self.type_name().to_owned()
    }
}

/// A value that is only known through its text representation.
pub trait OpaqueValue: fmt::Display + fmt::Debug + Send + Sync {}

impl<T> OpaqueValue for T where T: fmt::Display + fmt::Debug + Send + Sync {}

/// Raw value produced by a conversion, property, or reflected field.
#[derive(Clone, Debug, Default)]
pub enum FieldValue {
    #[default]
    Null,
    String(String),
    Map(Vec<(String, FieldValue)>),
    DateTime(DateTime<FixedOffset>),
    Duration(TimeDelta),
    Char(char),
    Chars(Vec<char>),
    Byte(u8),
    Bytes(Vec<u8>),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    /// Symbolic name of an enumerated value.
    Enum(String),
    Uuid(Uuid),
    Uri(Url),
    /// Thread context stack, outermost entry first.
    Stack(Vec<String>),
    Seq(Vec<FieldValue>),
    Object(Arc<dyn Reflectable>),
    Opaque(Arc<dyn OpaqueValue>),
}

impl FieldValue {
    /// Build a mapping from ordered key/value pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a sequence from any iterable of convertible values.
    pub fn seq<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Self::Seq(items.into_iter().map(Into::into).collect())
    }

    /// Wrap a reflectable object.
    pub fn object<R: Reflectable + 'static>(value: R) -> Self {
        Self::Object(Arc::new(value))
    }

    /// Wrap a value that only offers a `Display` representation.
    pub fn opaque<T: OpaqueValue + 'static>(value: T) -> Self {
        Self::Opaque(Arc::new(value))
    }

    /// Return the enumerated symbol for any `Debug` value, e.g. a fieldless enum.
    pub fn symbol<T: fmt::Debug>(value: &T) -> Self {
        Self::Enum(format!("{value:?}"))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    /// Plain text rendering used by templates; strings are not quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::String(s) | Self::Enum(s) => f.write_str(s),
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("}")
            }
            Self::DateTime(dt) => f.write_str(&crate::normalize::format_timestamp(dt)),
            Self::Duration(d) => write!(f, "{}", crate::normalize::duration_seconds(d)),
            Self::Char(c) => write!(f, "{c}"),
            Self::Chars(cs) => cs.iter().try_for_each(|c| write!(f, "{c}")),
            Self::Byte(b) => f.write_str(&String::from_utf8_lossy(&[*b])),
            Self::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Self::Int(n) => write!(f, "{n}"),
            Self::UInt(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Uuid(id) => write!(f, "{id}"),
            Self::Uri(url) => f.write_str(url.as_str()),
            Self::Stack(items) => f.write_str(&items.join(" ")),
            Self::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Object(obj) => f.write_str(&obj.string_form()),
            Self::Opaque(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<char> for FieldValue {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                Self::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                Self::UInt(u64::from(value))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u16, u32, u64);

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        Self::Byte(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for FieldValue {
    fn from(value: DateTime<Tz>) -> Self {
        Self::DateTime(value.fixed_offset())
    }
}

impl From<TimeDelta> for FieldValue {
    fn from(value: TimeDelta) -> Self {
        Self::Duration(value)
    }
}

impl From<std::time::Duration> for FieldValue {
    fn from(value: std::time::Duration) -> Self {
        Self::Duration(TimeDelta::from_std(value).unwrap_or(TimeDelta::MAX))
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<Url> for FieldValue {
    fn from(value: Url) -> Self {
        Self::Uri(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Colour {
        Teal,
    }

    #[test]
    fn symbol_uses_variant_name() {
        let value = FieldValue::symbol(&Colour::Teal);
        assert!(matches!(value, FieldValue::Enum(ref s) if s == "Teal"));
    }

    #[test]
    fn display_renders_plain_text() {
        let value = FieldValue::map([("a", FieldValue::seq([1i64, 2])), ("b", "x".into())]);
        assert_eq!(value.to_string(), "{a=[1, 2], b=x}");
        assert_eq!(FieldValue::Null.to_string(), "");
        assert_eq!(
            FieldValue::Stack(vec!["outer".into(), "inner".into()]).to_string(),
            "outer inner"
        );
    }

    #[test]
    fn option_none_becomes_null() {
        assert!(FieldValue::from(None::<&str>).is_null());
        assert_eq!(FieldValue::from(Some("x")).as_str(), Some("x"));
    }
}
