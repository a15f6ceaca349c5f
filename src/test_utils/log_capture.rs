//! Capturing `log` backend for crate unit tests.
//!
//! Layout setup reports bad configuration through `log::warn!` and
//! `log::error!` instead of failing. Tests install this backend, run the code
//! under test and then inspect what was reported. The capture is shared by the
//! whole test binary, so tests asserting on it must be `#[serial]`.

use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

#[derive(Clone, Debug)]
pub(crate) struct CapturedLog {
    pub level: Level,
    pub message: String,
}

impl CapturedLog {
    pub fn is(&self, level: Level, fragment: &str) -> bool {
        self.level == level && self.message.contains(fragment)
    }
}

struct Capture;

static CAPTURE: Capture = Capture;
static INSTALL: Once = Once::new();
static RECORDS: Lazy<Mutex<Vec<CapturedLog>>> = Lazy::new(|| Mutex::new(Vec::new()));

impl Log for Capture {
    // Only setup diagnostics are interesting here.
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            RECORDS.lock().push(CapturedLog {
                level: record.level(),
                message: record.args().to_string(),
            });
        }
    }

    fn flush(&self) {}
}

/// Route the `log` facade here (once per binary) and forget earlier records.
pub(crate) fn install_test_logger() {
    INSTALL.call_once(|| {
        log::set_logger(&CAPTURE).expect("no other logger in unit tests");
        log::set_max_level(LevelFilter::Warn);
    });
    RECORDS.lock().clear();
}

/// Drain everything captured since the last install or take.
pub(crate) fn take_logged_messages() -> Vec<CapturedLog> {
    std::mem::take(&mut *RECORDS.lock())
}

/// Drain the capture and report whether any record at `level` mentions
/// `fragment`.
pub(crate) fn logged(level: Level, fragment: &str) -> bool {
    take_logged_messages()
        .iter()
        .any(|record| record.is(level, fragment))
}
