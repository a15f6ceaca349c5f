//! Log event representation consumed by the layout.
//!
//! The layout only needs read access to an event, expressed by the
//! [`LoggingEvent`] trait. [`FemtoLogEvent`] is the owned implementation used
//! by this crate and its tests; hosts with their own record type implement the
//! trait directly.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::thread::{self, ThreadId};

use chrono::{DateTime, Utc};

use crate::exception::ExceptionInfo;
use crate::level::FemtoLevel;
use crate::value::FieldValue;

/// Source location of the logging call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLocation<'a> {
    pub module_path: &'a str,
    pub filename: &'a str,
    pub line_number: u32,
}

/// Read-only view of a log event.
pub trait LoggingEvent {
    /// The already-rendered message text.
    fn rendered_message(&self) -> Cow<'_, str>;

    /// The raw message object, when the host kept one.
    fn message_object(&self) -> Option<&FieldValue> {
        None
    }

    /// Look up a named property.
    fn property(&self, name: &str) -> Option<&FieldValue>;

    /// All named properties.
    fn properties(&self) -> Box<dyn Iterator<Item = (&str, &FieldValue)> + '_>;

    fn timestamp(&self) -> DateTime<Utc>;

    /// Severity label, e.g. `INFO`.
    fn level(&self) -> &str;

    fn logger_name(&self) -> &str;

    /// Thread name, or its identifier when unnamed.
    fn thread_name(&self) -> Cow<'_, str>;

    fn exception(&self) -> Option<&ExceptionInfo> {
        None
    }

    /// Nested diagnostic context stack, outermost entry first.
    fn ndc(&self) -> &[String] {
        &[]
    }

    fn location(&self) -> Option<SourceLocation<'_>> {
        None
    }

    /// Host name reported for the event.
    fn hostname(&self) -> Option<Cow<'_, str>> {
        env_hostname().map(Cow::Owned)
    }

    /// Application name reported for the event.
    fn app_name(&self) -> Option<Cow<'_, str>> {
        current_app_name().map(Cow::Owned)
    }
}

fn env_hostname() -> Option<String> {
    ["HOSTNAME", "COMPUTERNAME"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
}

fn current_app_name() -> Option<String> {
    let exe = std::env::current_exe().ok()?;
    exe.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Additional context associated with an event.
#[derive(Clone, Debug)]
pub struct EventMetadata {
    /// Rust module path where the log call originated.
    pub module_path: String,
    /// Source file name for the log call.
    pub filename: String,
    /// Line number in the source file.
    pub line_number: u32,
    /// Time the event was created.
    pub timestamp: DateTime<Utc>,
    /// ID of the thread that created the event.
    pub thread_id: ThreadId,
    /// Name of the thread that created the event (if any).
    pub thread_name: Option<String>,
    /// Structured properties attached to the event.
    pub properties: BTreeMap<String, FieldValue>,
    /// Nested diagnostic context, outermost first.
    pub ndc: Vec<String>,
    pub hostname: Option<String>,
    pub app_name: Option<String>,
}

impl EventMetadata {
    /// Capture timestamp and thread info from the current execution context.
    fn capture_runtime() -> (DateTime<Utc>, ThreadId, Option<String>) {
        let current = thread::current();
        (
            Utc::now(),
            current.id(),
            current.name().map(ToString::to_string),
        )
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        let (timestamp, thread_id, thread_name) = Self::capture_runtime();
        Self {
            module_path: String::new(),
            filename: String::new(),
            line_number: 0,
            timestamp,
            thread_id,
            thread_name,
            properties: BTreeMap::new(),
            ndc: Vec::new(),
            hostname: None,
            app_name: None,
        }
    }
}

/// Owned log event.
#[derive(Clone, Debug)]
pub struct FemtoLogEvent {
    /// Name of the logger that created this event.
    pub logger: String,
    pub level: FemtoLevel,
    /// The rendered message content.
    pub message: String,
    pub message_object: Option<FieldValue>,
    pub exception: Option<ExceptionInfo>,
    pub metadata: EventMetadata,
}

impl FemtoLogEvent {
    /// Construct a new event from logger `name`, `level`, and `message`.
    pub fn new(logger: &str, level: FemtoLevel, message: &str) -> Self {
        Self {
            logger: logger.to_owned(),
            level,
            message: message.to_owned(),
            message_object: None,
            exception: None,
            metadata: EventMetadata::default(),
        }
    }

    /// Construct an event from metadata captured elsewhere, such as an event
    /// forwarded from another thread. The metadata is used as given.
    pub fn with_metadata(
        logger: &str,
        level: FemtoLevel,
        message: &str,
        metadata: EventMetadata,
    ) -> Self {
        Self {
            logger: logger.to_owned(),
            level,
            message: message.to_owned(),
            message_object: None,
            exception: None,
            metadata,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.metadata.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_message_object(mut self, value: impl Into<FieldValue>) -> Self {
        self.message_object = Some(value.into());
        self
    }

    /// Push a nested diagnostic context entry.
    pub fn with_ndc(mut self, entry: impl Into<String>) -> Self {
        self.metadata.ndc.push(entry.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.metadata.timestamp = timestamp;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.metadata.hostname = Some(hostname.into());
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.metadata.app_name = Some(app_name.into());
        self
    }
}

impl LoggingEvent for FemtoLogEvent {
    fn rendered_message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn message_object(&self) -> Option<&FieldValue> {
        self.message_object.as_ref()
    }

    fn property(&self, name: &str) -> Option<&FieldValue> {
        self.metadata.properties.get(name)
    }

    fn properties(&self) -> Box<dyn Iterator<Item = (&str, &FieldValue)> + '_> {
        Box::new(
            self.metadata
                .properties
                .iter()
                .map(|(k, v)| (k.as_str(), v)),
        )
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.metadata.timestamp
    }

    fn level(&self) -> &str {
        self.level.as_str()
    }

    fn logger_name(&self) -> &str {
        &self.logger
    }

    fn thread_name(&self) -> Cow<'_, str> {
        match &self.metadata.thread_name {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("{:?}", self.metadata.thread_id)),
        }
    }

    fn exception(&self) -> Option<&ExceptionInfo> {
        self.exception.as_ref()
    }

    fn ndc(&self) -> &[String] {
        &self.metadata.ndc
    }

    fn location(&self) -> Option<SourceLocation<'_>> {
        let meta = &self.metadata;
        (!meta.filename.is_empty() || !meta.module_path.is_empty()).then_some(SourceLocation {
            module_path: &meta.module_path,
            filename: &meta.filename,
            line_number: meta.line_number,
        })
    }

    fn hostname(&self) -> Option<Cow<'_, str>> {
        match &self.metadata.hostname {
            Some(name) => Some(Cow::Borrowed(name)),
            None => env_hostname().map(Cow::Owned),
        }
    }

    fn app_name(&self) -> Option<Cow<'_, str>> {
        match &self.metadata.app_name {
            Some(name) => Some(Cow::Borrowed(name)),
            None => current_app_name().map(Cow::Owned),
        }
    }
}

impl fmt::Display for FemtoLogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.logger, self.level, self.message)
    }
}
