//! Send/Sync guarantees for core types.

use femtologging_json::{
    Arrangement, ConversionRegistry, EscapeTable, FieldValue, JsonEncoder, JsonLayout,
    JsonLayoutBuilder, NormalizedValue, Normalizer, ParseContext, PresetTable, SharedFormatter,
};
use rstest::rstest;
use static_assertions::assert_impl_all;

#[rstest]
fn builders_are_send_sync() {
    assert_impl_all!(JsonLayoutBuilder: Send, Sync, Clone);
    assert_impl_all!(ParseContext: Send, Sync, Clone);
    assert_impl_all!(PresetTable: Send, Sync);
    assert_impl_all!(ConversionRegistry: Send, Sync);
}

#[rstest]
fn components_are_send_sync() {
    assert_impl_all!(JsonLayout: Send, Sync);
    assert_impl_all!(SharedFormatter: Send, Sync);
    assert_impl_all!(Arrangement: Send, Sync);
    assert_impl_all!(Normalizer: Send, Sync);
    assert_impl_all!(JsonEncoder: Send, Sync);
    assert_impl_all!(EscapeTable: Send, Sync);
    assert_impl_all!(FieldValue: Send, Sync);
    assert_impl_all!(NormalizedValue: Send, Sync);
}
