//! JSON layout: the end-to-end event formatter.
//!
//! A [`JsonLayout`] holds members resolved once by [`JsonLayoutBuilder`]. Per
//! event it reads every member, normalises the values into one ordered
//! mapping, and encodes that mapping as JSON text. Formatting takes `&self`
//! and touches no shared mutable state beyond the per-member "failure
//! reported" flags, so a layout can be shared freely across threads.

use std::fmt;
use std::sync::Arc;

use crate::arrangement::ResolvedMember;
use crate::encoder::JsonEncoder;
use crate::event::LoggingEvent;
use crate::formatter::{FemtoFormatter, FormatError};
use crate::normalize::{NormalizationError, Normalizer};
use crate::value::{NormalizedValue, ValueMap};

mod builder;

pub use builder::JsonLayoutBuilder;

/// Formats log events as single JSON documents.
#[derive(Clone, Debug)]
pub struct JsonLayout {
    members: Arc<[ResolvedMember]>,
    normalizer: Normalizer,
    encoder: JsonEncoder,
}

impl Default for JsonLayout {
    /// Layout using the `DEFAULT` preset.
    fn default() -> Self {
        JsonLayoutBuilder::new().build()
    }
}

impl JsonLayout {
    pub fn builder() -> JsonLayoutBuilder {
        JsonLayoutBuilder::new()
    }

    pub(crate) fn from_parts(
        members: Vec<ResolvedMember>,
        normalizer: Normalizer,
        encoder: JsonEncoder,
    ) -> Self {
        Self {
            members: members.into(),
            normalizer,
            encoder,
        }
    }

    /// Names of the resolved members in output order.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(ResolvedMember::name)
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn encoder(&self) -> &JsonEncoder {
        &self.encoder
    }

    /// Normalised document for `event`.
    ///
    /// Without members this is the rendered message as a string. A lone
    /// unnamed member yields its own value, or null. Otherwise members are
    /// collected into a mapping in order, omitting those without a value.
    pub fn to_value(&self, event: &dyn LoggingEvent) -> Result<NormalizedValue, NormalizationError> {
        match &*self.members {
            [] => Ok(NormalizedValue::String(event.rendered_message().into_owned())),
            [only] if only.name().is_empty() => match only.value(event) {
                Some(value) => self.normalizer.normalize(&value),
                None => Ok(NormalizedValue::Null),
            },
            members => {
                let mut map = ValueMap::new();
                for member in members {
                    if let Some(value) = member.value(event) {
                        self.normalizer.normalize_into(member.name(), &value, &mut map)?;
                    }
                }
                Ok(NormalizedValue::Map(map))
            }
        }
    }

    /// Format `event` into a new string.
    pub fn format_event(&self, event: &dyn LoggingEvent) -> Result<String, FormatError> {
        let mut out = String::new();
        self.write_event(event, &mut out)?;
        Ok(out)
    }

    /// Append the formatted `event` to `out` without a trailing newline.
    ///
    /// A layout without members writes the rendered message verbatim.
    pub fn write_event<W: fmt::Write + ?Sized>(
        &self,
        event: &dyn LoggingEvent,
        out: &mut W,
    ) -> Result<(), FormatError> {
        if self.members.is_empty() {
            out.write_str(&event.rendered_message())?;
            return Ok(());
        }
        let value = self.to_value(event)?;
        let text = self.encoder.encode(&value)?;
        out.write_str(&text)?;
        Ok(())
    }
}

impl FemtoFormatter for JsonLayout {
    fn format(&self, event: &dyn LoggingEvent) -> Result<String, FormatError> {
        self.format_event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::{Member, PresetTable};
    use crate::event::FemtoLogEvent;
    use crate::level::FemtoLevel;
    use crate::value::FieldValue;
    use rstest::{fixture, rstest};
    use static_assertions::assert_impl_all;

    #[fixture]
    fn event() -> FemtoLogEvent {
        FemtoLogEvent::new("app", FemtoLevel::Info, "a<b")
            .with_property("user", "ada")
            .with_property("ctx", FieldValue::map([("a", FieldValue::map([("b", 1i64)]))]))
    }

    fn layout(spec: &str) -> JsonLayout {
        JsonLayout::builder()
            .with_presets(PresetTable::standard())
            .with_arrangement(spec)
            .build_strict()
            .expect("valid layout")
    }

    #[test]
    fn layout_is_send_sync() {
        assert_impl_all!(JsonLayout: Send, Sync, Clone);
    }

    #[rstest]
    fn members_render_in_order_with_escaping(event: FemtoLogEvent) {
        let json = layout("message;level;user").format_event(&event).expect("format");
        assert_eq!(json, r#"{"message":"a\u003cb","level":"INFO","user":"ada"}"#);
    }

    #[rstest]
    fn zero_members_fall_back_to_rendered_message(event: FemtoLogEvent) {
        let json = layout("DEFAULT;CLEAR").format_event(&event).expect("format");
        assert_eq!(json, "a<b");
    }

    #[rstest]
    fn lone_unnamed_member_is_emitted_directly(event: FemtoLogEvent) {
        assert_eq!(layout(":message").format_event(&event).expect("format"), r#""a\u003cb""#);
        assert_eq!(layout(":file").format_event(&event).expect("format"), "null");
    }

    #[rstest]
    fn unnamed_mapping_member_is_spliced(event: FemtoLogEvent) {
        let json = layout("level;:properties").format_event(&event).expect("format");
        assert_eq!(json, r#"{"level":"INFO","ctx":{"a":{"b":1}},"user":"ada"}"#);
    }

    #[rstest]
    fn flatten_rewrites_nested_members(event: FemtoLogEvent) {
        let layout = JsonLayout::builder()
            .with_member(Member::conversion_with_option("ctx", "property", "ctx"))
            .with_member(Member::conversion("level", "level"))
            .with_flatten(true)
            .build();
        assert_eq!(
            layout.format_event(&event).expect("format"),
            r#"{"ctx.a.b":1,"level":"INFO"}"#
        );
    }

    #[rstest]
    fn write_event_appends_to_sink(event: FemtoLogEvent) {
        let mut out = String::from("> ");
        layout("level").write_event(&event, &mut out).expect("write");
        assert_eq!(out, r#"> {"level":"INFO"}"#);
    }
}
