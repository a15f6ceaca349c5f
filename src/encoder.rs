//! JSON text rendering for [`NormalizedValue`]s.
//!
//! Values are written by `serde_json` through an [`EscapingFormatter`], which
//! routes every string and key through an [`EscapeTable`]. The default table
//! covers the JSON control characters plus `<`, `>` and `&` so output can be
//! embedded in markup or script contexts. Any remaining character outside
//! printable ASCII is written as a `\u` escape, using surrogate pairs above
//! the BMP.

use std::collections::BTreeMap;
use std::io;

use serde::Serialize;
use serde::ser::Error as _;
use serde_json::Serializer;
use serde_json::ser::{CharEscape, CompactFormatter, Formatter};

use crate::value::NormalizedValue;

const ASCII_LEN: usize = 128;

/// Character-to-replacement table applied when encoding strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscapeTable {
    ascii: Vec<Option<String>>,
    extended: BTreeMap<char, String>,
}

impl Default for EscapeTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for code in 0u8..0x20 {
            let replacement = match code {
                0x08 => "\\b".to_owned(),
                0x09 => "\\t".to_owned(),
                0x0a => "\\n".to_owned(),
                0x0c => "\\f".to_owned(),
                0x0d => "\\r".to_owned(),
                _ => unicode_escape(u16::from(code)),
            };
            table.set(char::from(code), replacement);
        }
        table.set('"', "\\\"");
        table.set('\\', "\\\\");
        table.set('<', unicode_escape(u16::from(b'<')));
        table.set('>', unicode_escape(u16::from(b'>')));
        table.set('&', unicode_escape(u16::from(b'&')));
        table
    }
}

impl EscapeTable {
    /// A table with no entries; only characters outside printable ASCII are
    /// escaped, plus the characters JSON itself requires.
    pub fn empty() -> Self {
        Self {
            ascii: vec![None; ASCII_LEN],
            extended: BTreeMap::new(),
        }
    }

    /// Replace `c` with `replacement` whenever it appears in a string.
    pub fn set(&mut self, c: char, replacement: impl Into<String>) {
        let replacement = replacement.into();
        match ascii_index(c) {
            Some(i) => self.ascii[i] = Some(replacement),
            None => {
                self.extended.insert(c, replacement);
            }
        }
    }

    /// Remove any replacement registered for `c`.
    pub fn unset(&mut self, c: char) {
        match ascii_index(c) {
            Some(i) => self.ascii[i] = None,
            None => {
                self.extended.remove(&c);
            }
        }
    }

    pub fn with(mut self, c: char, replacement: impl Into<String>) -> Self {
        self.set(c, replacement);
        self
    }

    pub fn without(mut self, c: char) -> Self {
        self.unset(c);
        self
    }

    pub fn get(&self, c: char) -> Option<&str> {
        match ascii_index(c) {
            Some(i) => self.ascii[i].as_deref(),
            None => self.extended.get(&c).map(String::as_str),
        }
    }

    /// Write a run of characters that needs no JSON-mandated escaping,
    /// applying table replacements and `\u` escapes.
    fn write_fragment<W>(&self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let replacement = self.get(c);
            if replacement.is_none() && (' '..='~').contains(&c) {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            match replacement {
                Some(replacement) => writer.write_all(replacement.as_bytes())?,
                None => {
                    let mut units = [0u16; 2];
                    for unit in c.encode_utf16(&mut units) {
                        writer.write_all(unicode_escape(*unit).as_bytes())?;
                    }
                }
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

fn ascii_index(c: char) -> Option<usize> {
    let i = c as usize;
    (i < ASCII_LEN).then_some(i)
}

fn unicode_escape(unit: u16) -> String {
    format!("\\u{unit:04x}")
}

fn escaped_char(escape: &CharEscape) -> char {
    match escape {
        CharEscape::Quote => '"',
        CharEscape::ReverseSolidus => '\\',
        CharEscape::Solidus => '/',
        CharEscape::Backspace => '\u{8}',
        CharEscape::FormFeed => '\u{c}',
        CharEscape::LineFeed => '\n',
        CharEscape::CarriageReturn => '\r',
        CharEscape::Tab => '\t',
        CharEscape::AsciiControl(byte) => char::from(*byte),
    }
}

/// Compact `serde_json` formatter that escapes strings through an
/// [`EscapeTable`].
#[derive(Clone, Copy, Debug)]
pub struct EscapingFormatter<'a> {
    escapes: &'a EscapeTable,
}

impl<'a> EscapingFormatter<'a> {
    pub fn new(escapes: &'a EscapeTable) -> Self {
        Self { escapes }
    }
}

impl Formatter for EscapingFormatter<'_> {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.escapes.write_fragment(writer, fragment)
    }

    fn write_char_escape<W>(&mut self, writer: &mut W, char_escape: CharEscape) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match self.escapes.get(escaped_char(&char_escape)) {
            Some(replacement) => writer.write_all(replacement.as_bytes()),
            // Quotes, backslashes and control characters stay escaped even
            // when the table drops them, so the output remains JSON.
            None => CompactFormatter.write_char_escape(writer, char_escape),
        }
    }
}

/// Render `value` as JSON text using `escapes`.
pub fn encode(value: &NormalizedValue, escapes: &EscapeTable) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    encode_to_writer(value, escapes, &mut buf)?;
    String::from_utf8(buf).map_err(serde_json::Error::custom)
}

/// Write the JSON text for `value` to `writer`.
pub fn encode_to_writer<W: io::Write>(
    value: &NormalizedValue,
    escapes: &EscapeTable,
    writer: W,
) -> serde_json::Result<()> {
    let mut serializer = Serializer::with_formatter(writer, EscapingFormatter::new(escapes));
    value.serialize(&mut serializer)
}

/// JSON encoder bound to a fixed escape table.
#[derive(Clone, Debug, Default)]
pub struct JsonEncoder {
    escapes: EscapeTable,
}

impl JsonEncoder {
    pub fn new(escapes: EscapeTable) -> Self {
        Self { escapes }
    }

    pub fn escapes(&self) -> &EscapeTable {
        &self.escapes
    }

    pub fn encode(&self, value: &NormalizedValue) -> serde_json::Result<String> {
        encode(value, &self.escapes)
    }
}
