//! Shared fixtures for layout integration tests.
//!
//! Layouts built here resolve presets from a private standard table so tests
//! stay independent of the process-wide preset table.

use chrono::{TimeZone, Utc};
use femtologging_json::{
    ExceptionInfo, FemtoLevel, FemtoLogEvent, JsonLayout, JsonLayoutBuilder, PresetTable,
    StackFrame,
};
use rstest::fixture;

/// Builder resolving presets from a fresh standard table.
pub fn builder() -> JsonLayoutBuilder {
    JsonLayout::builder().with_presets(PresetTable::standard())
}

/// Strictly build a layout from arrangement text.
pub fn layout_for(spec: &str) -> JsonLayout {
    builder()
        .with_arrangement(spec)
        .build_strict()
        .expect("arrangement should parse")
}

/// An event with fixed time, host, application and context.
#[fixture]
pub fn event() -> FemtoLogEvent {
    FemtoLogEvent::new("billing.invoice", FemtoLevel::Error, "payment declined")
        .with_timestamp(
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 58)
                .single()
                .expect("valid date"),
        )
        .with_hostname("pay-01")
        .with_app_name("billing")
        .with_property("order", 4711i64)
        .with_property("user", "ada")
        .with_ndc("req-9")
        .with_exception(
            ExceptionInfo::new("CardError", "insufficient funds")
                .with_frames(vec![StackFrame::new("pay.rs", 88, "charge")]),
        )
}
