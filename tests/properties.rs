//! Property-based checks for round-tripping and member order.

use std::collections::BTreeMap;

use femtologging_json::{
    Arrangement, FemtoLevel, FemtoLogEvent, FieldValue, JsonLayout, JsonEncoder, Member, normalize,
};
use itertools::Itertools;
use proptest::prelude::*;

mod test_utils;
use test_utils::builder;

fn literal_layout(members: &BTreeMap<String, String>) -> JsonLayout {
    members
        .iter()
        .fold(builder(), |b, (name, value)| b.with_member(Member::literal(name, value)))
        .build()
}

proptest! {
    #[test]
    fn normalized_mappings_round_trip(
        ref entries in proptest::collection::btree_map("[a-zA-Z_][a-zA-Z0-9_.]{0,12}", any::<String>(), 0..8)
    ) {
        let raw = FieldValue::map(entries.clone());
        let normalized = normalize(&raw, false).expect("normalize");
        let text = JsonEncoder::default().encode(&normalized).expect("encode");
        let decoded: BTreeMap<String, String> = serde_json::from_str(&text).expect("valid json");
        prop_assert_eq!(&decoded, entries);
    }

    #[test]
    fn literal_members_round_trip_through_layout(
        ref entries in proptest::collection::btree_map("[a-z]{1,8}", "\\PC*", 2..6)
    ) {
        let event = FemtoLogEvent::new("prop", FemtoLevel::Info, "x");
        let text = literal_layout(entries).format_event(&event).expect("format");
        let decoded: BTreeMap<String, String> = serde_json::from_str(&text).expect("valid json");
        prop_assert_eq!(&decoded, entries);
    }

    #[test]
    fn keys_follow_member_order(names in proptest::sample::subsequence(
        vec!["alpha", "bravo", "charlie", "delta", "echo"], 2..5
    ).prop_shuffle()) {
        let event = FemtoLogEvent::new("prop", FemtoLevel::Info, "x");
        let layout = names
            .iter()
            .fold(builder(), |b, name| b.with_member(Member::literal(*name, "v")))
            .build();
        let text = layout.format_event(&event).expect("format");
        let expected = names.iter().map(|n| format!("\"{n}\":\"v\"")).join(",");
        prop_assert_eq!(text, format!("{{{expected}}}"));
    }
}

#[test]
fn composition_shape_does_not_change_key_order() {
    let event = FemtoLogEvent::new("prop", FemtoLevel::Info, "x");
    for order in ["A", "B", "C"].into_iter().permutations(3) {
        let members: Vec<Arrangement> = order.iter().map(|n| Member::literal(*n, *n).into()).collect();
        let flat = builder()
            .with_arrangement_value(Arrangement::composite(members.clone()))
            .build();
        let nested = builder()
            .with_arrangement_value(Arrangement::composite(vec![
                members[0].clone(),
                Arrangement::composite(vec![
                    Arrangement::Identity,
                    Arrangement::composite(members[1..].to_vec()),
                ]),
            ]))
            .build();
        let expected = format!(
            "{{{}}}",
            order.iter().map(|n| format!("\"{n}\":\"{n}\"")).join(",")
        );
        assert_eq!(flat.format_event(&event).expect("format"), expected);
        assert_eq!(nested.format_event(&event).expect("format"), expected);
    }
}
