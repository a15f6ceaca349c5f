//! Builder for [`JsonLayout`].

use std::sync::Arc;

use log::error;

use super::JsonLayout;
use crate::arrangement::{Arrangement, Member, ParseContext, PresetTable, parse};
use crate::config::ConfigError;
use crate::conversion::{ConversionRegistry, ConversionResult};
use crate::encoder::{EscapeTable, JsonEncoder};
use crate::event::LoggingEvent;
use crate::normalize::Normalizer;
use crate::template::TemplateEngine;

#[derive(Clone, Debug)]
enum Piece {
    Spec(String),
    Arrangement(Arrangement),
}

/// Builder for [`JsonLayout`].
///
/// Arrangement text and explicit members are applied in the order they were
/// added. With neither, the layout uses the `DEFAULT` preset.
#[derive(Clone, Debug, Default)]
pub struct JsonLayoutBuilder {
    pieces: Vec<Piece>,
    ctx: ParseContext,
    normalizer: Normalizer,
    escapes: EscapeTable,
}

impl JsonLayoutBuilder {
    /// Create a new `JsonLayoutBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append arrangement-spec text, parsed when the layout is built.
    pub fn with_arrangement(mut self, spec: impl Into<String>) -> Self {
        self.pieces.push(Piece::Spec(spec.into()));
        self
    }

    /// Append an already constructed arrangement.
    pub fn with_arrangement_value(mut self, arrangement: Arrangement) -> Self {
        self.pieces.push(Piece::Arrangement(arrangement));
        self
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.pieces.push(Piece::Arrangement(member.into()));
        self
    }

    /// Register a conversion, replacing any built-in of the same name.
    pub fn with_conversion<F>(mut self, name: impl Into<String>, conversion: F) -> Self
    where
        F: Fn(&dyn LoggingEvent, Option<&str>) -> ConversionResult + Send + Sync + 'static,
    {
        self.ctx = self.ctx.with_conversion(name, conversion);
        self
    }

    /// Merge caller conversions; names already registered are kept.
    pub fn with_conversions(mut self, conversions: &ConversionRegistry) -> Self {
        self.ctx = self.ctx.with_conversions(conversions);
        self
    }

    pub fn with_template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.ctx = self.ctx.with_template_engine(engine);
        self
    }

    /// Register a custom arrangement available as `name!option`.
    pub fn with_arrangement_factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str) -> Result<Arrangement, String> + Send + Sync + 'static,
    {
        self.ctx = self.ctx.with_factory(name, factory);
        self
    }

    /// Resolve presets from `presets` instead of the process-wide table.
    pub fn with_presets(mut self, presets: PresetTable) -> Self {
        self.ctx = self.ctx.with_presets(presets);
        self
    }

    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.normalizer = self.normalizer.with_flatten(flatten);
        self
    }

    pub fn with_type_key(mut self, key: impl Into<String>) -> Self {
        self.normalizer = self.normalizer.with_type_key(key);
        self
    }

    pub fn with_string_key(mut self, key: impl Into<String>) -> Self {
        self.normalizer = self.normalizer.with_string_key(key);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.normalizer = self.normalizer.with_max_depth(max_depth);
        self
    }

    /// Escape `c` as `replacement` in every string.
    pub fn with_escape(mut self, c: char, replacement: impl Into<String>) -> Self {
        self.escapes.set(c, replacement);
        self
    }

    /// Stop escaping `c` through the table.
    pub fn without_escape(mut self, c: char) -> Self {
        self.escapes.unset(c);
        self
    }

    pub fn with_escape_table(mut self, escapes: EscapeTable) -> Self {
        self.escapes = escapes;
        self
    }

    pub fn context(&self) -> &ParseContext {
        &self.ctx
    }

    /// Build the layout, logging and skipping arrangement text that fails to
    /// parse.
    pub fn build(&self) -> JsonLayout {
        let arrangements = self
            .pieces
            .iter()
            .filter_map(|piece| match self.arrangement(piece) {
                Ok(arrangement) => Some(arrangement),
                Err(err) => {
                    error!("JsonLayout: ignoring invalid arrangement: {err}");
                    None
                }
            })
            .collect();
        self.assemble(arrangements)
    }

    /// Build the layout, failing on the first arrangement text that does not
    /// parse.
    pub fn build_strict(&self) -> Result<JsonLayout, ConfigError> {
        let arrangements = self
            .pieces
            .iter()
            .map(|piece| self.arrangement(piece))
            .collect::<Result<_, _>>()?;
        Ok(self.assemble(arrangements))
    }

    fn arrangement(&self, piece: &Piece) -> Result<Arrangement, ConfigError> {
        match piece {
            Piece::Spec(spec) => Ok(parse(spec, &self.ctx)?),
            Piece::Arrangement(arrangement) => Ok(arrangement.clone()),
        }
    }

    fn assemble(&self, arrangements: Vec<Arrangement>) -> JsonLayout {
        let root = if self.pieces.is_empty() {
            Arrangement::Preset(None)
        } else {
            Arrangement::composite(arrangements)
        };
        let members = root
            .members(&self.ctx)
            .iter()
            .map(|member| member.resolve(&self.ctx))
            .collect();
        JsonLayout::from_parts(
            members,
            self.normalizer.clone(),
            JsonEncoder::new(self.escapes.clone()),
        )
    }
}
