//! Arrangement-spec scenarios through the public parser API.

use femtologging_json::arrangement::NamePattern;
use femtologging_json::{Arrangement, FemtoLogEvent, Member, MemberSource, ParseContext, PresetTable, parse};
use rstest::{fixture, rstest};

mod test_utils;
use test_utils::{event, layout_for};

#[fixture]
fn ctx() -> ParseContext {
    ParseContext::with_builtins().with_presets(PresetTable::standard())
}

#[rstest]
fn nxlog_and_nested_member(ctx: ParseContext) {
    let Arrangement::Composite { option, children } =
        parse("DEFAULT!nxlog;Host=Name:hostname", &ctx).expect("parse")
    else {
        panic!("expected a composite arrangement");
    };
    assert!(option.is_none());
    assert_eq!(children[0], Arrangement::Preset(Some("nxlog".into())));
    let Arrangement::Member(host) = &children[1] else {
        panic!("expected a member");
    };
    assert_eq!(host.name(), "Host");
    let Some(MemberSource::Nested(inner)) = host.source() else {
        panic!("expected a nested member");
    };
    assert_eq!(inner.name(), "Name");
    assert_eq!(
        inner.source(),
        Some(&MemberSource::Conversion {
            name: "hostname".into(),
            option: None
        })
    );
}

#[rstest]
fn clear_empties_any_member_list(ctx: ParseContext) {
    let clear = parse("CLEAR", &ctx).expect("parse");
    assert_eq!(clear, Arrangement::Removal(None));
    let mut members = Arrangement::Preset(None).members(&ctx);
    assert!(!members.is_empty());
    clear.apply(&mut members, &ctx);
    assert!(members.is_empty());
    clear.apply(&mut members, &ctx);
    assert!(members.is_empty());
}

#[rstest]
#[case(r"\\", "\\")]
#[case(r"\;", ";")]
#[case(r"\=", "=")]
#[case(r"\:", ":")]
#[case(r"\!", "!")]
#[case(r"\%", "%")]
#[case(r"\|", "|")]
#[case(r"\(", "(")]
#[case(r"\)", ")")]
fn escapes_resolve_to_literal_characters(
    event: FemtoLogEvent,
    #[case] escaped: &str,
    #[case] literal: &str,
) {
    let spec = format!("k{escaped}ey=va{escaped}lue");
    let text = layout_for(&spec).format_event(&event).expect("format");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    let key = format!("k{literal}ey");
    assert_eq!(value[key.as_str()], format!("va{literal}lue"));
}

#[rstest]
fn removal_patterns_compare_by_source(ctx: ParseContext) {
    let parsed = parse("REMOVE!^(thread|ndc)$", &ctx).expect("parse");
    let pattern = NamePattern::new("^(thread|ndc)$").expect("regex");
    assert_eq!(parsed, Arrangement::Removal(Some(pattern)));
}

#[rstest]
fn deferred_option_sees_late_conversions(event: FemtoLogEvent) {
    let deferred = Arrangement::option("tier:tier");
    let early = ParseContext::with_builtins();
    let late = early.clone().with_conversion("tier", |_, _| Ok(Some("gold".into())));
    let member = &deferred.members(&late)[0];
    let value = member.resolve(&late).value(&event).expect("value");
    assert_eq!(value.to_string(), "gold");
    assert!(member.resolve(&early).value(&event).is_none());
}

#[rstest]
fn explicit_members_match_parsed_ones(ctx: ParseContext) {
    let parsed = parse("a;b:level;c=x;d%date:%H;e|%m", &ctx).expect("parse");
    let built = Arrangement::composite(vec![
        Member::conversion("a", "a").into(),
        Member::conversion("b", "level").into(),
        Member::literal("c", "x").into(),
        Member::conversion_with_option("d", "date", "%H").into(),
        Member::template("e", "%m").into(),
    ]);
    assert_eq!(parsed, built);
}
