//! Named conversions: short aliases mapped to getters over log events.
//!
//! A conversion receives the event and an optional argument (the `option` of a
//! `name%conv:option` member or a `%conv{option}` template token) and yields a
//! raw [`FieldValue`], or `None` when the event has nothing to report.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::sync::Arc;

use chrono::Local;
use chrono::format::{Item, StrftimeItems};
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::event::LoggingEvent;
use crate::value::FieldValue;

/// Errors raised by a conversion while reading an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The date format option could not be parsed.
    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),
    /// The conversion failed for a reason of its own.
    #[error("{0}")]
    Failed(String),
}

/// Result type shared by conversions and getters.
pub type ConversionResult = Result<Option<FieldValue>, ConversionError>;

/// A registered conversion taking the event and an optional argument.
pub type ConversionFn =
    Arc<dyn Fn(&dyn LoggingEvent, Option<&str>) -> ConversionResult + Send + Sync>;

/// A resolved value source for one member.
pub type Getter = Arc<dyn Fn(&dyn LoggingEvent) -> ConversionResult + Send + Sync>;

/// Wrap a closure as a [`Getter`].
pub fn getter<F>(f: F) -> Getter
where
    F: Fn(&dyn LoggingEvent) -> ConversionResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`ConversionFn`].
pub fn conversion<F>(f: F) -> ConversionFn
where
    F: Fn(&dyn LoggingEvent, Option<&str>) -> ConversionResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Bind `option` to `conversion`, producing a getter.
pub fn bind(conversion: ConversionFn, option: Option<String>) -> Getter {
    getter(move |event| conversion(event, option.as_deref()))
}

/// Getter that reads the event property called `name`.
pub fn property_getter(name: impl Into<String>) -> Getter {
    let name = name.into();
    getter(move |event| Ok(event.property(&name).cloned()))
}

/// Registry of conversions keyed by name.
#[derive(Clone, Default)]
pub struct ConversionRegistry {
    entries: BTreeMap<String, ConversionFn>,
}

impl fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

static BUILTINS: Lazy<ConversionRegistry> = Lazy::new(builtin_registry);

impl ConversionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the built-in conversions.
    pub fn with_builtins() -> Self {
        BUILTINS.clone()
    }

    /// Register `conversion` under `name`, replacing any existing entry.
    pub fn register<F>(&mut self, name: impl Into<String>, conversion: F) -> &mut Self
    where
        F: Fn(&dyn LoggingEvent, Option<&str>) -> ConversionResult + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), self::conversion(conversion));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, conversion: F) -> Self
    where
        F: Fn(&dyn LoggingEvent, Option<&str>) -> ConversionResult + Send + Sync + 'static,
    {
        self.register(name, conversion);
        self
    }

    /// Add every entry of `other` whose name is not registered yet.
    pub fn merge(&mut self, other: &ConversionRegistry) {
        for (name, conversion) in &other.entries {
            self.entries
                .entry(name.clone())
                .or_insert_with(|| Arc::clone(conversion));
        }
    }

    pub fn get(&self, name: &str) -> Option<ConversionFn> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn format_date(
    event: &dyn LoggingEvent,
    option: Option<&str>,
    local: bool,
) -> ConversionResult {
    let ts = event.timestamp();
    let Some(pattern) = option.filter(|p| !p.is_empty()) else {
        return Ok(Some(if local {
            ts.with_timezone(&Local).into()
        } else {
            ts.into()
        }));
    };
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(ConversionError::InvalidDateFormat(pattern.to_owned()));
    }
    let mut text = String::new();
    let written = if local {
        write!(text, "{}", ts.with_timezone(&Local).format(pattern))
    } else {
        write!(text, "{}", ts.format(pattern))
    };
    written.map_err(|_| ConversionError::InvalidDateFormat(pattern.to_owned()))?;
    Ok(Some(text.into()))
}

fn all_properties(event: &dyn LoggingEvent) -> FieldValue {
    FieldValue::Map(
        event
            .properties()
            .map(|(k, v)| (k.to_owned(), v.clone()))
            .collect(),
    )
}

fn env_user() -> Option<String> {
    ["USER", "USERNAME"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
}

fn builtin_registry() -> ConversionRegistry {
    let mut registry = ConversionRegistry::new();
    let aliases: &[(&[&str], ConversionFn)] = &[
        (
            &["date", "d"],
            conversion(|event, option| format_date(event, option, true)),
        ),
        (
            &["utcdate"],
            conversion(|event, option| format_date(event, option, false)),
        ),
        (
            &["timestamp"],
            conversion(|event, _| Ok(Some(event.timestamp().timestamp_millis().into()))),
        ),
        (
            &["level", "p"],
            conversion(|event, _| Ok(Some(event.level().into()))),
        ),
        (
            &["logger", "c"],
            conversion(|event, _| Ok(Some(event.logger_name().into()))),
        ),
        (
            &["thread", "t"],
            conversion(|event, _| Ok(Some(event.thread_name().into_owned().into()))),
        ),
        (
            &["message", "m"],
            conversion(|event, _| Ok(Some(event.rendered_message().into_owned().into()))),
        ),
        (
            &["messageobject"],
            conversion(|event, _| {
                Ok(Some(event.message_object().cloned().unwrap_or_else(|| {
                    event.rendered_message().into_owned().into()
                })))
            }),
        ),
        (
            &["exception"],
            conversion(|event, _| Ok(event.exception().cloned().map(FieldValue::object))),
        ),
        (
            &["ndc", "x"],
            conversion(|event, _| {
                let stack = event.ndc();
                Ok((!stack.is_empty()).then(|| FieldValue::Stack(stack.to_vec())))
            }),
        ),
        (
            &["property", "P", "X", "mdc"],
            conversion(|event, option| match option.filter(|k| !k.is_empty()) {
                Some(key) => Ok(event.property(key).cloned()),
                None => Ok(Some(all_properties(event))),
            }),
        ),
        (
            &["properties"],
            conversion(|event, _| Ok(Some(all_properties(event)))),
        ),
        (
            &["appname", "appdomain", "a"],
            conversion(|event, _| Ok(event.app_name().map(|n| n.into_owned().into()))),
        ),
        (
            &["hostname"],
            conversion(|event, _| Ok(event.hostname().map(|n| n.into_owned().into()))),
        ),
        (
            &["username", "w"],
            conversion(|_, _| Ok(env_user().map(Into::into))),
        ),
        (
            &["file", "F"],
            conversion(|event, _| Ok(event.location().map(|l| l.filename.into()))),
        ),
        (
            &["line", "L"],
            conversion(|event, _| Ok(event.location().map(|l| l.line_number.into()))),
        ),
        (
            &["method", "M", "module"],
            conversion(|event, _| Ok(event.location().map(|l| l.module_path.into()))),
        ),
        (
            &["newline", "n"],
            conversion(|_, _| Ok(Some("\n".into()))),
        ),
    ];
    for (names, conversion) in aliases {
        for name in *names {
            registry
                .entries
                .insert((*name).to_owned(), Arc::clone(conversion));
        }
    }
    registry
}
