//! Benchmarks for building and formatting with `JsonLayout`.

use chrono::{TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use femtologging_json::{
    ExceptionInfo, FemtoLevel, FemtoLogEvent, FieldValue, JsonLayout, PresetTable, StackFrame,
};

fn sample_event() -> FemtoLogEvent {
    let timestamp = Utc
        .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    FemtoLogEvent::new("bench.layout", FemtoLevel::Warn, "cache miss for <key>")
        .with_timestamp(timestamp)
        .with_hostname("bench-host")
        .with_app_name("bench")
        .with_property("user", "ada")
        .with_property(
            "ctx",
            FieldValue::map([("shard", FieldValue::from(7i64)), ("hot", true.into())]),
        )
        .with_ndc("outer")
        .with_exception(
            ExceptionInfo::new("CacheError", "miss")
                .with_frames(vec![StackFrame::new("cache.rs", 42, "lookup")]),
        )
}

fn layout(spec: &str) -> JsonLayout {
    JsonLayout::builder()
        .with_presets(PresetTable::standard())
        .with_arrangement(spec)
        .build()
}

fn bench_format(c: &mut Criterion) {
    let event = sample_event();
    let mut group = c.benchmark_group("format_event");
    for (name, spec) in [
        ("default", "DEFAULT"),
        ("nxlog", "nxlog"),
        ("flat_properties", "level;message;:properties"),
    ] {
        let layout = layout(spec);
        group.bench_function(name, |b| {
            b.iter(|| layout.format_event(black_box(&event)))
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("build_nxlog_layout", |b| {
        b.iter(|| layout(black_box("nxlog;REMOVE!^(Thread|Ndc)$;Host=Name:hostname")))
    });
}

criterion_group!(benches, bench_format, bench_build);
criterion_main!(benches);
