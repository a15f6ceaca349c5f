//! Micro-templating for `name|template` members.
//!
//! The arrangement parser hands template text to a [`TemplateEngine`] which
//! compiles it once into a [`Getter`]. [`PatternTemplate`] is the built-in
//! engine. It understands `%conv`, `%conv{option}`, padded forms such as
//! `%-5level` or `%10logger`, and `%%` for a literal percent sign. Everything
//! else is copied verbatim.

use thiserror::Error;

use crate::conversion::{ConversionFn, ConversionRegistry, Getter, getter};
use crate::event::LoggingEvent;

/// Widest padding a conversion may request.
pub const MAX_WIDTH: usize = 1024;

/// Errors raised while compiling a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template names a conversion that is not registered.
    #[error("unknown conversion '{name}' in template")]
    UnknownConversion { name: String },
    /// A `{` option was never closed.
    #[error("unterminated option at offset {offset}")]
    UnterminatedOption { offset: usize },
    /// A `%` was not followed by a conversion name.
    #[error("dangling '%' at offset {offset}")]
    DanglingPercent { offset: usize },
    /// A padding width overflowed or exceeded [`MAX_WIDTH`].
    #[error("padding width at offset {offset} is larger than 1024")]
    InvalidWidth { offset: usize },
}

/// Compiles template text into a getter.
pub trait TemplateEngine: Send + Sync {
    fn compile(&self, template: &str, conversions: &ConversionRegistry)
    -> Result<Getter, TemplateError>;
}

/// Built-in `%conv{option}` pattern engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct PatternTemplate;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Padding {
    width: usize,
    left_align: bool,
}

enum Segment {
    Literal(String),
    Conversion {
        conversion: ConversionFn,
        option: Option<String>,
        padding: Padding,
    },
}

impl TemplateEngine for PatternTemplate {
    fn compile(
        &self,
        template: &str,
        conversions: &ConversionRegistry,
    ) -> Result<Getter, TemplateError> {
        let segments = parse_segments(template, conversions)?;
        Ok(getter(move |event| Ok(Some(render(&segments, event)?.into()))))
    }
}

fn render(
    segments: &[Segment],
    event: &dyn LoggingEvent,
) -> Result<String, crate::conversion::ConversionError> {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Conversion {
                conversion,
                option,
                padding,
            } => {
                let text = conversion(event, option.as_deref())?
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                let fill = padding.width.saturating_sub(text.chars().count());
                if padding.left_align {
                    out.push_str(&text);
                    out.extend(std::iter::repeat_n(' ', fill));
                } else {
                    out.extend(std::iter::repeat_n(' ', fill));
                    out.push_str(&text);
                }
            }
        }
    }
    Ok(out)
}

fn parse_segments(
    template: &str,
    conversions: &ConversionRegistry,
) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        if chars.next_if(|&(_, next)| next == '%').is_some() {
            literal.push('%');
            continue;
        }

        let mut padding = Padding::default();
        if chars.next_if(|&(_, next)| next == '-').is_some() {
            padding.left_align = true;
        }
        while let Some((_, digit)) = chars.next_if(|(_, d)| d.is_ascii_digit()) {
            padding.width = padding
                .width
                .checked_mul(10)
                .and_then(|w| w.checked_add(digit as usize - '0' as usize))
                .filter(|&w| w <= MAX_WIDTH)
                .ok_or(TemplateError::InvalidWidth { offset })?;
        }

        let mut name = String::new();
        while let Some((_, ch)) = chars.next_if(|(_, ch)| ch.is_ascii_alphanumeric() || *ch == '_')
        {
            name.push(ch);
        }
        if name.is_empty() {
            return Err(TemplateError::DanglingPercent { offset });
        }

        let option = match chars.next_if(|&(_, next)| next == '{') {
            Some((open, _)) => {
                let mut option = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, ch)) => option.push(ch),
                        None => return Err(TemplateError::UnterminatedOption { offset: open }),
                    }
                }
                Some(option)
            }
            None => None,
        };

        let conversion = conversions
            .get(&name)
            .ok_or_else(|| TemplateError::UnknownConversion { name: name.clone() })?;
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Conversion {
            conversion,
            option,
            padding,
        });
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FemtoLogEvent;
    use crate::level::FemtoLevel;
    use rstest::rstest;

    fn render_template(template: &str) -> Result<String, TemplateError> {
        let getter = PatternTemplate.compile(template, &ConversionRegistry::with_builtins())?;
        let event = FemtoLogEvent::new("app", FemtoLevel::Info, "ready").with_property("user", "ada");
        let value = getter(&event).expect("render").expect("value");
        Ok(value.to_string())
    }

    #[rstest]
    #[case("%level %message", "INFO ready")]
    #[case("[%-5level]", "[INFO ]")]
    #[case("[%6logger]", "[   app]")]
    #[case("%property{user}@%logger", "ada@app")]
    #[case("100%% %m", "100% ready")]
    #[case("plain text", "plain text")]
    #[case("[%2m]", "[ready]")]
    fn renders_patterns(#[case] template: &str, #[case] expected: &str) {
        assert_eq!(render_template(template).expect("compile"), expected);
    }

    #[test]
    fn widest_padding_is_accepted() {
        let rendered = render_template("[%-1024level]").expect("compile");
        assert_eq!(rendered, format!("[INFO{}]", " ".repeat(1020)));
    }

    #[rstest]
    #[case("%nope", TemplateError::UnknownConversion { name: "nope".into() })]
    #[case("%property{user", TemplateError::UnterminatedOption { offset: 9 })]
    #[case("50% off", TemplateError::DanglingPercent { offset: 2 })]
    #[case("%99999999999999999999999level", TemplateError::InvalidWidth { offset: 0 })]
    #[case("x %2000level", TemplateError::InvalidWidth { offset: 2 })]
    fn rejects_malformed_templates(#[case] template: &str, #[case] expected: TemplateError) {
        assert_eq!(render_template(template).expect_err("must fail"), expected);
    }
}
