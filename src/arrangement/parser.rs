//! Arrangement-spec grammar.
//!
//! A spec is a `;`-separated list of member specs:
//!
//! | Shape              | Result                                              |
//! | ------------------ | --------------------------------------------------- |
//! | `name`             | member reading conversion `name`                    |
//! | `name:conv`        | member reading conversion `conv`                    |
//! | `name=value`       | literal, or a nested spec when `value` has operators |
//! | `name\|template`    | member rendered through the template engine        |
//! | `name%conv:option` | conversion `conv` invoked with `option`             |
//! | `NAME!option`      | `CLEAR`/`REMOVE`, `DEFAULT`, or a custom factory    |
//!
//! A backslash escapes any of `\ ; = : ! % | ( )`. Inside templates unescaped
//! parentheses become the pattern engine's `{`/`}` option delimiters.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::member::{Member, MemberSource};
use super::preset::{self, PresetTable};
use super::{Arrangement, NamePattern};
use crate::conversion::{ConversionRegistry, ConversionResult};
use crate::event::LoggingEvent;
use crate::template::{PatternTemplate, TemplateEngine};

const ESCAPE: char = '\\';
const SEPARATOR: char = ';';
const OPERATORS: [char; 5] = ['!', '=', ':', '|', '%'];
const ESCAPABLE: [char; 9] = ['\\', ';', '=', ':', '!', '%', '|', '(', ')'];

/// Errors raised while parsing arrangement-spec text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A backslash was not followed by an escapable character.
    #[error("invalid escape at offset {offset} in '{segment}'")]
    InvalidEscape { segment: String, offset: usize },
    /// The member spec does not match any shape.
    #[error("unexpected input in '{segment}': {reason}")]
    Unexpected {
        segment: String,
        reason: &'static str,
    },
    /// `NAME!` used a word that is neither reserved nor registered.
    #[error("unknown reserved word '{0}'")]
    UnknownReservedWord(String),
    /// `NAME!` named a qualified custom arrangement that is not registered.
    #[error("custom arrangement '{0}' is not registered")]
    UnresolvedArrangement(String),
    /// A removal pattern is not a valid regular expression.
    #[error("invalid removal pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// A custom arrangement factory rejected its option.
    #[error("custom arrangement '{name}' failed: {message}")]
    CustomArrangement { name: String, message: String },
}

/// Builds a custom arrangement from its `NAME!option` option text.
pub type ArrangementFactory = Arc<dyn Fn(&str) -> Result<Arrangement, String> + Send + Sync>;

/// Everything a parse or an apply needs besides the spec text.
///
/// The context is passed explicitly into every nested parse, so an inner spec
/// always sees the same conversions and factories as its parent.
#[derive(Clone)]
pub struct ParseContext {
    conversions: Arc<ConversionRegistry>,
    templates: Arc<dyn TemplateEngine>,
    factories: BTreeMap<String, ArrangementFactory>,
    presets: Option<Arc<PresetTable>>,
}

impl fmt::Debug for ParseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseContext")
            .field("conversions", &self.conversions)
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("presets", &self.presets)
            .finish_non_exhaustive()
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ParseContext {
    /// Context over `conversions` with the built-in template engine.
    pub fn new(conversions: ConversionRegistry) -> Self {
        Self {
            conversions: Arc::new(conversions),
            templates: Arc::new(PatternTemplate),
            factories: BTreeMap::new(),
            presets: None,
        }
    }

    pub fn with_builtins() -> Self {
        Self::new(ConversionRegistry::with_builtins())
    }

    /// Register `conversion` under `name`, replacing an existing entry.
    pub fn with_conversion<F>(mut self, name: impl Into<String>, conversion: F) -> Self
    where
        F: Fn(&dyn LoggingEvent, Option<&str>) -> ConversionResult + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.conversions).register(name, conversion);
        self
    }

    /// Add caller conversions without overriding names already present.
    pub fn with_conversions(mut self, conversions: &ConversionRegistry) -> Self {
        Arc::make_mut(&mut self.conversions).merge(conversions);
        self
    }

    pub fn with_template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.templates = engine;
        self
    }

    /// Register a custom arrangement reachable as `NAME!option`.
    pub fn with_factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str) -> Result<Arrangement, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Use `presets` instead of the process-wide preset table.
    pub fn with_presets(mut self, presets: PresetTable) -> Self {
        self.presets = Some(Arc::new(presets));
        self
    }

    pub fn conversions(&self) -> &ConversionRegistry {
        &self.conversions
    }

    pub fn templates(&self) -> &dyn TemplateEngine {
        self.templates.as_ref()
    }

    pub fn factory(&self, name: &str) -> Option<&ArrangementFactory> {
        self.factories.get(name)
    }

    pub(crate) fn preset_spec(&self, key: Option<&str>) -> Option<String> {
        match &self.presets {
            Some(table) => table.resolve(key).map(|(_, spec)| spec.to_owned()),
            None => preset::resolve_global(key),
        }
    }
}

/// Parse top-level arrangement-spec text.
///
/// Bare `DEFAULT`, `default`, `nxlog` and `CLEAR` segments are accepted as
/// shorthands for their `NAME!option` forms.
pub fn parse(spec: &str, ctx: &ParseContext) -> Result<Arrangement, ParseError> {
    parse_with(spec, ctx, true)
}

/// Parse spec text nested in another spec or in a preset.
pub(crate) fn parse_nested(spec: &str, ctx: &ParseContext) -> Result<Arrangement, ParseError> {
    parse_with(spec, ctx, false)
}

fn parse_with(spec: &str, ctx: &ParseContext, top_level: bool) -> Result<Arrangement, ParseError> {
    let mut children = Vec::new();
    for raw in split_unescaped(spec, SEPARATOR) {
        let segment = raw.trim();
        if segment.is_empty() {
            continue;
        }
        let segment = if top_level {
            expand_shorthand(segment)
        } else {
            segment
        };
        children.push(parse_segment(segment, ctx)?);
    }
    Ok(match children.len() {
        0 => Arrangement::Identity,
        1 => children.remove(0),
        _ => Arrangement::composite(children),
    })
}

fn expand_shorthand(segment: &str) -> &str {
    match segment {
        "DEFAULT" | "default" => "DEFAULT!",
        "nxlog" => "DEFAULT!nxlog",
        "CLEAR" => "CLEAR!",
        other => other,
    }
}

fn parse_segment(segment: &str, ctx: &ParseContext) -> Result<Arrangement, ParseError> {
    if let Some((pos, _)) = find_unescaped(segment, |c| c == '!')
        && is_arrangement_name(&segment[..pos])
    {
        return parse_reserved(segment, &segment[..pos], unescape(&segment[pos + 1..])?, ctx);
    }
    let Some((pos, op)) = find_unescaped(segment, |c| OPERATORS.contains(&c)) else {
        let name = unescape(segment)?;
        return Ok(Member::conversion(name.clone(), name).into());
    };
    let head = &segment[..pos];
    let rest = &segment[pos + op.len_utf8()..];
    match op {
        ':' => {
            if rest.is_empty() {
                return Err(unexpected(segment, "missing conversion name after ':'"));
            }
            if find_unescaped(rest, |c| OPERATORS.contains(&c)).is_some() {
                return Err(unexpected(segment, "operator in conversion name"));
            }
            Ok(Member::conversion(unescape(head)?, unescape(rest)?).into())
        }
        '=' => parse_assignment(segment, head, rest, ctx),
        '|' => Ok(Member::template(unescape(head)?, unescape_template(rest)?).into()),
        '%' => {
            let (conv, option) = match find_unescaped(rest, |c| c == ':') {
                Some((colon, _)) => (&rest[..colon], Some(unescape(&rest[colon + 1..])?)),
                None => (rest, None),
            };
            let conv = unescape(conv)?;
            if conv.is_empty() {
                return Err(unexpected(segment, "missing conversion name after '%'"));
            }
            Ok(Member::with_source(
                unescape(head)?,
                MemberSource::Conversion { name: conv, option },
            )
            .into())
        }
        '!' => parse_reserved(segment, &unescape(head)?, unescape(rest)?, ctx),
        _ => Err(unexpected(segment, "unrecognised operator")),
    }
}

fn parse_assignment(
    segment: &str,
    head: &str,
    rest: &str,
    ctx: &ParseContext,
) -> Result<Arrangement, ParseError> {
    let name = unescape(head)?;
    if find_unescaped(rest, |c| OPERATORS.contains(&c)).is_none() {
        return Ok(Member::literal(name, unescape(rest)?).into());
    }
    let source = match parse_nested(&unescape_separators(rest), ctx)? {
        Arrangement::Member(inner) => MemberSource::Nested(Box::new(inner)),
        Arrangement::Identity => return Err(unexpected(segment, "empty nested spec")),
        group => MemberSource::Arrangement(Box::new(group)),
    };
    Ok(Member::with_source(name, source).into())
}

fn parse_reserved(
    segment: &str,
    name: &str,
    option: String,
    ctx: &ParseContext,
) -> Result<Arrangement, ParseError> {
    match name {
        "" => Err(unexpected(segment, "missing name before '!'")),
        "CLEAR" | "REMOVE" if option.is_empty() => Ok(Arrangement::Removal(None)),
        "CLEAR" | "REMOVE" => NamePattern::new(&option)
            .map(|p| Arrangement::Removal(Some(p)))
            .map_err(|source| ParseError::InvalidPattern {
                pattern: option,
                source,
            }),
        "DEFAULT" => Ok(Arrangement::Preset((!option.is_empty()).then_some(option))),
        custom => match ctx.factory(custom) {
            Some(factory) => factory(&option).map_err(|message| ParseError::CustomArrangement {
                name: custom.to_owned(),
                message,
            }),
            None if custom.contains('.') || custom.contains("::") => {
                Err(ParseError::UnresolvedArrangement(custom.to_owned()))
            }
            None => Err(ParseError::UnknownReservedWord(custom.to_owned())),
        },
    }
}

/// Reserved words and qualified names such as `app.Tagged` or `crate::Tagged`.
fn is_arrangement_name(head: &str) -> bool {
    !head.is_empty()
        && head
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':'))
}

fn unexpected(segment: &str, reason: &'static str) -> ParseError {
    ParseError::Unexpected {
        segment: segment.to_owned(),
        reason,
    }
}

/// Split on unescaped `sep`, keeping escapes in the pieces.
fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == ESCAPE {
            chars.next();
        } else if c == sep {
            pieces.push(&s[start..i]);
            start = i + sep.len_utf8();
        }
    }
    pieces.push(&s[start..]);
    pieces
}

/// Byte offset and character of the first unescaped match.
fn find_unescaped(s: &str, pred: impl Fn(char) -> bool) -> Option<(usize, char)> {
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == ESCAPE {
            chars.next();
        } else if pred(c) {
            return Some((i, c));
        }
    }
    None
}

fn unescape(s: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some((_, next)) if ESCAPABLE.contains(&next) => out.push(next),
            _ => {
                return Err(ParseError::InvalidEscape {
                    segment: s.to_owned(),
                    offset: i,
                });
            }
        }
    }
    Ok(out)
}

/// Unescape template text, mapping bare parentheses to `{`/`}`.
fn unescape_template(s: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '(' => out.push('{'),
            ')' => out.push('}'),
            ESCAPE => match chars.next() {
                Some((_, next)) if ESCAPABLE.contains(&next) => out.push(next),
                _ => {
                    return Err(ParseError::InvalidEscape {
                        segment: s.to_owned(),
                        offset: i,
                    });
                }
            },
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Strip one level of `\;` so a nested spec sees its own separators.
fn unescape_separators(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(SEPARATOR) => out.push(SEPARATOR),
            Some(next) => {
                out.push(ESCAPE);
                out.push(next);
            }
            None => out.push(ESCAPE),
        }
    }
    out
}
