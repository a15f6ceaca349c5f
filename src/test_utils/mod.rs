//! Test-only helpers shared across crate unit tests.

pub mod log_capture;
