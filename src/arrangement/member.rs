//! Members: named output slots and their setup-time resolution.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, warn};

use super::Arrangement;
use super::parser::ParseContext;
use crate::conversion::{ConversionError, Getter, bind, getter, property_getter};
use crate::event::LoggingEvent;
use crate::value::FieldValue;

/// Where a member's value comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum MemberSource {
    /// A fixed string, or an option value for hosts that read it.
    Literal(String),
    /// A named conversion, optionally invoked with an argument.
    Conversion {
        name: String,
        option: Option<String>,
    },
    /// Template text compiled by the context's template engine.
    Template(String),
    /// A group of members rendered as a nested mapping.
    Arrangement(Box<Arrangement>),
    /// Another member. Its name is adopted when the outer name is empty.
    Nested(Box<Member>),
}

/// A named output field of the layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Member {
    name: String,
    source: Option<MemberSource>,
}

impl Member {
    /// A member without a source. It reports a same-named event property,
    /// or its own name when the event has none.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
        }
    }

    pub fn with_source(name: impl Into<String>, source: MemberSource) -> Self {
        Self {
            name: name.into(),
            source: Some(source),
        }
    }

    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_source(name, MemberSource::Literal(value.into()))
    }

    pub fn conversion(name: impl Into<String>, conversion: impl Into<String>) -> Self {
        Self::with_source(
            name,
            MemberSource::Conversion {
                name: conversion.into(),
                option: None,
            },
        )
    }

    pub fn conversion_with_option(
        name: impl Into<String>,
        conversion: impl Into<String>,
        option: impl Into<String>,
    ) -> Self {
        Self::with_source(
            name,
            MemberSource::Conversion {
                name: conversion.into(),
                option: Some(option.into()),
            },
        )
    }

    pub fn template(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::with_source(name, MemberSource::Template(template.into()))
    }

    pub fn group(name: impl Into<String>, arrangement: Arrangement) -> Self {
        Self::with_source(name, MemberSource::Arrangement(Box::new(arrangement)))
    }

    pub fn nested(name: impl Into<String>, inner: Member) -> Self {
        Self::with_source(name, MemberSource::Nested(Box::new(inner)))
    }

    /// Effective name, adopting a nested member's name when unset.
    pub fn name(&self) -> &str {
        match &self.source {
            Some(MemberSource::Nested(inner)) if self.name.is_empty() => inner.name(),
            _ => &self.name,
        }
    }

    pub fn source(&self) -> Option<&MemberSource> {
        self.source.as_ref()
    }

    /// Resolve the member's getter once against `ctx`.
    pub fn resolve(&self, ctx: &ParseContext) -> ResolvedMember {
        let name = self.name().to_owned();
        let mut resolved = ResolvedMember {
            name,
            getter: None,
            literal: None,
            name_fallback: false,
            failure_logged: AtomicBool::new(false),
        };
        match &self.source {
            None => resolved.name_fallback = true,
            Some(MemberSource::Literal(value)) => resolved.literal = Some(value.clone()),
            Some(MemberSource::Conversion { name, option }) => {
                resolved.getter = Some(resolve_conversion(name, option.clone(), ctx));
            }
            Some(MemberSource::Template(template)) => {
                match ctx.templates().compile(template, ctx.conversions()) {
                    Ok(getter) => resolved.getter = Some(getter),
                    Err(err) => {
                        error!(
                            "JsonLayout: template '{template}' for member '{}' failed to compile: {err}",
                            resolved.name
                        );
                        resolved.literal = Some(template.clone());
                    }
                }
            }
            Some(MemberSource::Arrangement(arrangement)) => {
                let inner: Vec<ResolvedMember> = arrangement
                    .members(ctx)
                    .iter()
                    .map(|m| m.resolve(ctx))
                    .collect();
                resolved.getter = Some(getter(move |event| Ok(group_value(&inner, event))));
            }
            Some(MemberSource::Nested(inner)) => {
                let inner = inner.resolve(ctx);
                resolved.getter = Some(getter(move |event| Ok(inner.value(event))));
            }
        }
        resolved
    }
}

fn resolve_conversion(name: &str, option: Option<String>, ctx: &ParseContext) -> Getter {
    match ctx.conversions().get(name) {
        Some(conversion) => bind(conversion, option),
        None => {
            warn!("JsonLayout: unknown conversion '{name}', reading the event property instead");
            property_getter(name)
        }
    }
}

/// Mapping of the inner members that yield a value, or `None` if none do.
fn group_value(members: &[ResolvedMember], event: &dyn LoggingEvent) -> Option<FieldValue> {
    let mut entries = Vec::new();
    for member in members {
        match member.value(event) {
            Some(FieldValue::Map(inner)) if member.name().is_empty() => entries.extend(inner),
            Some(value) => entries.push((member.name().to_owned(), value)),
            None => {}
        }
    }
    (!entries.is_empty()).then_some(FieldValue::Map(entries))
}

/// A member with its getter resolved and cached.
pub struct ResolvedMember {
    name: String,
    getter: Option<Getter>,
    literal: Option<String>,
    name_fallback: bool,
    failure_logged: AtomicBool,
}

impl ResolvedMember {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch the member's raw value for `event`.
    ///
    /// The getter is consulted first, then an event property with exactly the
    /// member's name, then the literal, and finally the member's own name
    /// when it was configured without any source.
    pub fn value(&self, event: &dyn LoggingEvent) -> Option<FieldValue> {
        if let Some(getter) = &self.getter {
            match getter(event) {
                Ok(Some(value)) if !value.is_null() => return Some(value),
                Ok(_) => {}
                Err(err) => self.report_failure(&err),
            }
        }
        if !self.name.is_empty()
            && let Some(value) = event.property(&self.name)
        {
            return Some(value.clone());
        }
        if let Some(literal) = &self.literal {
            return Some(literal.clone().into());
        }
        (self.name_fallback && !self.name.is_empty()).then(|| self.name.clone().into())
    }

    fn report_failure(&self, err: &ConversionError) {
        if !self.failure_logged.swap(true, Ordering::Relaxed) {
            warn!(
                "JsonLayout: member '{}' failed to read its value: {err}; further failures are not reported",
                self.name
            );
        }
    }
}

impl fmt::Debug for ResolvedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedMember")
            .field("name", &self.name)
            .field("has_getter", &self.getter.is_some())
            .field("literal", &self.literal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::PresetTable;
    use crate::event::FemtoLogEvent;
    use crate::level::FemtoLevel;
    use crate::test_utils::log_capture::{install_test_logger, logged, take_logged_messages};
    use rstest::{fixture, rstest};
    use serial_test::serial;

    #[fixture]
    fn ctx() -> ParseContext {
        ParseContext::with_builtins().with_presets(PresetTable::standard())
    }

    #[fixture]
    fn event() -> FemtoLogEvent {
        FemtoLogEvent::new("app.core", FemtoLevel::Error, "disk full")
            .with_property("user", "ada")
            .with_property("region", "eu-1")
            .with_hostname("web-3")
    }

    fn text(member: &Member, ctx: &ParseContext, event: &FemtoLogEvent) -> Option<String> {
        member.resolve(ctx).value(event).map(|v| v.to_string())
    }

    #[test]
    fn nested_member_name_is_adopted() {
        let member = Member::nested("", Member::conversion("Name", "hostname"));
        assert_eq!(member.name(), "Name");
        let named = Member::nested("Host", Member::conversion("Name", "hostname"));
        assert_eq!(named.name(), "Host");
    }

    #[rstest]
    #[case(Member::conversion("lvl", "level"), Some("ERROR"))]
    #[case(Member::conversion_with_option("who", "property", "user"), Some("ada"))]
    #[case(Member::literal("env", "prod"), Some("prod"))]
    #[case(Member::template("line", "%level: %message"), Some("ERROR: disk full"))]
    #[case(Member::nested("Host", Member::conversion("Name", "hostname")), Some("web-3"))]
    #[case(Member::new("plain"), Some("plain"))]
    #[case(Member::new(""), None)]
    fn resolves_each_source(
        ctx: ParseContext,
        event: FemtoLogEvent,
        #[case] member: Member,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(text(&member, &ctx, &event).as_deref(), expected);
    }

    #[rstest]
    fn same_named_property_beats_literal(ctx: ParseContext, event: FemtoLogEvent) {
        let member = Member::literal("region", "default");
        assert_eq!(text(&member, &ctx, &event).as_deref(), Some("eu-1"));
    }

    #[rstest]
    fn missing_conversion_value_falls_back_to_property(ctx: ParseContext, event: FemtoLogEvent) {
        let member = Member::conversion("user", "file");
        assert_eq!(text(&member, &ctx, &event).as_deref(), Some("ada"));
    }

    #[rstest]
    fn group_renders_inner_members_as_mapping(ctx: ParseContext, event: FemtoLogEvent) {
        let group = Arrangement::composite(vec![
            Member::conversion("lvl", "level").into(),
            Member::conversion("missing", "file").into(),
            Member::literal("env", "prod").into(),
        ]);
        let member = Member::group("ctx", group);
        assert_eq!(
            text(&member, &ctx, &event).as_deref(),
            Some("{lvl=ERROR, env=prod}")
        );
    }

    #[test]
    #[serial]
    fn unknown_conversion_warns_and_reads_property() {
        install_test_logger();
        let member = Member::conversion("who", "user");
        let resolved = member.resolve(&ParseContext::with_builtins());
        let event = FemtoLogEvent::new("core", FemtoLevel::Info, "x").with_property("user", "ada");
        assert_eq!(resolved.value(&event).map(|v| v.to_string()).as_deref(), Some("ada"));
        assert!(logged(log::Level::Warn, "unknown conversion 'user'"));
    }

    #[test]
    #[serial]
    fn failing_getter_is_reported_once() {
        install_test_logger();
        let ctx = ParseContext::with_builtins()
            .with_conversion("flaky", |_, _| Err(ConversionError::Failed("boom".into())));
        let resolved = Member::conversion("flaky", "flaky").resolve(&ctx);
        let event = FemtoLogEvent::new("core", FemtoLevel::Info, "x");
        for _ in 0..3 {
            assert!(resolved.value(&event).is_none());
        }
        let failures: Vec<_> = take_logged_messages()
            .into_iter()
            .filter(|l| l.message.contains("boom"))
            .collect();
        assert_eq!(failures.len(), 1);
    }

    #[test]
    #[serial]
    fn broken_template_keeps_raw_text() {
        install_test_logger();
        let resolved = Member::template("t", "%nope").resolve(&ParseContext::with_builtins());
        let event = FemtoLogEvent::new("core", FemtoLevel::Info, "x");
        assert_eq!(resolved.value(&event).map(|v| v.to_string()).as_deref(), Some("%nope"));
        assert!(logged(log::Level::Error, "failed to compile"));
    }

    #[test]
    #[serial]
    fn oversized_padding_keeps_raw_text() {
        install_test_logger();
        let template = "%99999999999999999999999level";
        let resolved = Member::template("t", template).resolve(&ParseContext::with_builtins());
        let event = FemtoLogEvent::new("core", FemtoLevel::Info, "x");
        assert_eq!(resolved.value(&event).map(|v| v.to_string()).as_deref(), Some(template));
        assert!(logged(log::Level::Error, "larger than 1024"));
    }
}
