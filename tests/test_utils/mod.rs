pub mod fixtures;

pub use fixtures::{builder, event, layout_for};
