//! Loading layouts from INI files on disk.

use std::io::Write;

use femtologging_json::config::apply_layout_str;
use femtologging_json::{ConfigError, FemtoLogEvent, load_layout_file};
use rstest::rstest;
use tempfile::NamedTempFile;

mod test_utils;
use test_utils::{builder, event};

fn ini_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp ini file");
    file.write_all(contents.as_bytes()).expect("write ini contents");
    file
}

#[rstest]
fn layout_file_drives_members(event: FemtoLogEvent) {
    let file = ini_file(
        "[layout]\n\
         arrangement = nxlog\n\
         arrangement = REMOVE!^(Thread|Exception|EventTime)$\n\
         member = Order%property:order\n",
    );
    let base = load_layout_file(file.path()).expect("load");
    let text = base
        .with_presets(femtologging_json::PresetTable::standard())
        .build_strict()
        .expect("valid")
        .format_event(&event)
        .expect("format");
    assert_eq!(
        text,
        concat!(
            r#"{"Hostname":"pay-01","Severity":"ERROR","SourceName":"billing","#,
            r#""Logger":"billing.invoice","Ndc":"req-9","Message":"payment declined","Order":4711}"#
        )
    );
}

#[rstest]
fn settings_layer_over_an_existing_builder(event: FemtoLogEvent) {
    let text = apply_layout_str(
        builder().with_conversion("region", |_, _| Ok(Some("eu".into()))),
        "[layout]\nmember = r:region\nmember = :message\n",
    )
    .expect("apply")
    .build_strict()
    .expect("valid")
    .format_event(&event)
    .expect("format");
    assert_eq!(text, r#"{"r":"eu","":"payment declined"}"#);
}

#[test]
fn unreadable_path_reports_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load_layout_file(dir.path()).expect_err("directories cannot be read");
    assert!(matches!(err, ConfigError::Io { .. }));
}
