//! Structured JSON layout for log events.
//!
//! An arrangement spec such as `DEFAULT!nxlog;Host=Name:hostname` decides
//! which members a [`JsonLayout`] emits. Each member's raw [`FieldValue`] is
//! reduced to a [`NormalizedValue`] and encoded with a configurable
//! [`EscapeTable`].
//!
//! ```
//! use femtologging_json::{FemtoLevel, FemtoLogEvent, JsonLayout};
//!
//! let layout = JsonLayout::builder()
//!     .with_arrangement("level;msg:message;user")
//!     .build_strict()
//!     .expect("valid arrangement");
//! let event = FemtoLogEvent::new("app", FemtoLevel::Info, "ready").with_property("user", "ada");
//! assert_eq!(
//!     layout.format_event(&event).expect("format"),
//!     r#"{"level":"INFO","msg":"ready","user":"ada"}"#
//! );
//! ```

pub mod arrangement;
pub mod config;
pub mod conversion;
pub mod encoder;
pub mod event;
pub mod exception;
pub mod formatter;
pub mod layout;
pub mod level;
pub mod normalize;
pub mod template;
pub mod value;

#[cfg(test)]
mod test_utils;

pub use arrangement::{
    Arrangement, Member, MemberSource, ParseContext, ParseError, PresetTable, parse,
};
pub use config::{ConfigError, load_layout_file, load_layout_str};
pub use conversion::{ConversionError, ConversionRegistry, Getter};
pub use encoder::{EscapeTable, EscapingFormatter, JsonEncoder, encode};
pub use event::{EventMetadata, FemtoLogEvent, LoggingEvent, SourceLocation};
pub use exception::{ExceptionInfo, StackFrame};
pub use formatter::{FemtoFormatter, FormatError, SharedFormatter};
pub use layout::{JsonLayout, JsonLayoutBuilder};
pub use level::FemtoLevel;
pub use normalize::{NormalizationError, Normalizer, normalize};
pub use template::{PatternTemplate, TemplateEngine, TemplateError};
pub use value::{FieldValue, NormalizedValue, Reflectable, ValueMap};
