//! Arrangements: rules that edit the ordered member list of a JSON layout.
//!
//! An [`Arrangement`] is built by the [`parser`] from arrangement-spec text and
//! applied once at setup time to a fresh `Vec<Member>`. Member order defines
//! the key order of every serialized event.

use std::fmt;

use log::error;
use regex::Regex;

pub mod member;
pub mod parser;
pub mod preset;

pub use member::{Member, MemberSource, ResolvedMember};
pub use parser::{ArrangementFactory, ParseContext, ParseError, parse};
pub use preset::{
    DEFAULT_PRESET, NXLOG_PRESET, PresetTable, global_presets, register_preset, reset_presets,
    set_default_preset,
};

/// Maximum number of nested preset or option expansions during one `apply`.
pub const MAX_NESTING: usize = 16;

/// Regular expression matched against member names by [`Arrangement::Removal`].
///
/// The pattern is unanchored: `REMOVE!message` also removes `messageobject`.
#[derive(Clone)]
pub struct NamePattern(Regex);

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.0.is_match(name)
    }
}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamePattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// A mutation rule over an ordered member list.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Arrangement {
    /// Leaves the list untouched.
    #[default]
    Identity,
    /// Spec text parsed with the context supplied to `apply`, not the one
    /// active when the arrangement was created.
    Option(String),
    /// A canned member list from the preset table. `None` selects the
    /// table's configured default key.
    Preset(Option<String>),
    /// Drops members whose name matches, or every member when `None`.
    Removal(Option<NamePattern>),
    /// Applies `option` first, then each child in order.
    Composite {
        option: Option<String>,
        children: Vec<Arrangement>,
    },
    /// Appends the member.
    Member(Member),
}

impl Arrangement {
    /// Arrangement that defers parsing `spec` until it is applied.
    pub fn option(spec: impl Into<String>) -> Self {
        Self::Option(spec.into())
    }

    /// Removal of members matching `pattern`.
    pub fn remove(pattern: &str) -> Result<Self, regex::Error> {
        NamePattern::new(pattern).map(|p| Self::Removal(Some(p)))
    }

    pub fn composite(children: Vec<Arrangement>) -> Self {
        Self::Composite {
            option: None,
            children,
        }
    }

    /// Apply this arrangement to `members`.
    ///
    /// Members already in the list are left alone unless this arrangement
    /// removes them, so repeated calls accumulate.
    pub fn apply(&self, members: &mut Vec<Member>, ctx: &ParseContext) {
        self.apply_at(members, ctx, 0);
    }

    /// Apply to an empty list and return the result.
    pub fn members(&self, ctx: &ParseContext) -> Vec<Member> {
        let mut members = Vec::new();
        self.apply(&mut members, ctx);
        members
    }

    fn apply_at(&self, members: &mut Vec<Member>, ctx: &ParseContext, depth: usize) {
        match self {
            Self::Identity => {}
            Self::Option(spec) => apply_spec(spec, members, ctx, depth),
            Self::Preset(key) => {
                if let Some(spec) = ctx.preset_spec(key.as_deref()) {
                    apply_spec(&spec, members, ctx, depth);
                }
            }
            Self::Removal(None) => members.clear(),
            Self::Removal(Some(pattern)) => members.retain(|m| !pattern.is_match(m.name())),
            Self::Composite { option, children } => {
                if let Some(spec) = option {
                    apply_spec(spec, members, ctx, depth);
                }
                for child in children {
                    child.apply_at(members, ctx, depth);
                }
            }
            Self::Member(member) => members.push(member.clone()),
        }
    }
}

fn apply_spec(spec: &str, members: &mut Vec<Member>, ctx: &ParseContext, depth: usize) {
    if depth >= MAX_NESTING {
        error!("JsonLayout: arrangement nesting exceeds {MAX_NESTING} levels at '{spec}'");
        return;
    }
    match parser::parse_nested(spec, ctx) {
        Ok(arrangement) => arrangement.apply_at(members, ctx, depth + 1),
        Err(err) => error!("JsonLayout: ignoring arrangement '{spec}': {err}"),
    }
}

impl From<Member> for Arrangement {
    fn from(member: Member) -> Self {
        Self::Member(member)
    }
}
