//! INI configuration for JSON layouts.
//!
//! A `[layout]` section is read with the `rust-ini` crate, with escape and
//! quote processing disabled so arrangement text reaches the parser verbatim.
//! Keys are applied in file order:
//!
//! ```ini
//! [layout]
//! arrangement = DEFAULT!nxlog
//! member = Host:hostname
//! flatten = true
//! type_key = $type
//! max_depth = 32
//! ```
//!
//! `arrangement` and `member` may repeat. Because `rust-ini` may treat `;`
//! after whitespace as a comment, prefer one `arrangement` line per member
//! group over long `;`-joined specs.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption};
use thiserror::Error;

use crate::arrangement::{Arrangement, ParseError, parse};
use crate::layout::JsonLayoutBuilder;

/// Name of the INI section holding layout settings.
pub const LAYOUT_SECTION: &str = "layout";

/// Errors raised while configuring a layout.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The INI text is malformed.
    #[error("invalid INI: {0}")]
    Ini(#[from] ini::ParseError),
    /// The configuration file does not exist.
    #[error("{} doesn't exist", path.display())]
    NotFound { path: PathBuf },
    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The INI text has no `[layout]` section.
    #[error("missing [{0}] section")]
    MissingSection(&'static str),
    /// The section contains a key this loader does not understand.
    #[error("unknown key '{0}' in [layout] section")]
    UnknownKey(String),
    /// A key has a value of the wrong shape.
    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },
    /// Arrangement text failed to parse.
    #[error("invalid arrangement: {0}")]
    Parse(#[from] ParseError),
}

/// Load layout settings from INI text into a fresh builder.
pub fn load_layout_str(text: &str) -> Result<JsonLayoutBuilder, ConfigError> {
    apply_layout_str(JsonLayoutBuilder::new(), text)
}

/// Load layout settings from the INI file at `path`.
pub fn load_layout_file(path: impl AsRef<Path>) -> Result<JsonLayoutBuilder, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ConfigError::Io {
            path: path.to_path_buf(),
            source: err,
        },
    })?;
    load_layout_str(&text)
}

/// Apply the `[layout]` section of `text` on top of `builder`.
///
/// Conversions and factories registered on `builder` beforehand are visible
/// when `member` values are parsed.
pub fn apply_layout_str(
    mut builder: JsonLayoutBuilder,
    text: &str,
) -> Result<JsonLayoutBuilder, ConfigError> {
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(text, options)?;
    let section = ini
        .section(Some(LAYOUT_SECTION))
        .ok_or(ConfigError::MissingSection(LAYOUT_SECTION))?;
    for (key, value) in section.iter() {
        let value = value.trim();
        builder = match key {
            "arrangement" => builder.with_arrangement(value),
            "member" => match parse(value, builder.context())? {
                Arrangement::Member(member) => builder.with_member(member),
                _ => return Err(invalid(key, value)),
            },
            "flatten" => builder.with_flatten(parse_bool(key, value)?),
            "type_key" => builder.with_type_key(value),
            "string_key" => builder.with_string_key(value),
            "max_depth" => builder.with_max_depth(value.parse().map_err(|_| invalid(key, value))?),
            other => return Err(ConfigError::UnknownKey(other.to_owned())),
        };
    }
    Ok(builder)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}
