//! Structured exception payloads attached to log events.
//!
//! [`ExceptionInfo`] captures an error's type, message, frames, and cause
//! chain. It implements [`Reflectable`] so the normalizer renders it as a
//! mapping like any other object.

use std::error::Error;
use std::fmt;

use crate::value::{FieldValue, Reflectable};

/// A single frame in a captured stack trace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackFrame {
    /// Source filename where the frame originated.
    pub filename: String,
    /// Line number in the source file.
    pub lineno: u32,
    /// Function or method name.
    pub function: String,
}

impl StackFrame {
    pub fn new(filename: impl Into<String>, lineno: u32, function: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            lineno,
            function: function.into(),
        }
    }
}

impl Reflectable for StackFrame {
    fn type_name(&self) -> &str {
        "StackFrame"
    }

    fn fields(&self) -> Vec<(String, FieldValue)> {
        vec![
            ("filename".into(), self.filename.clone().into()),
            ("lineno".into(), self.lineno.into()),
            ("function".into(), self.function.clone().into()),
        ]
    }

    fn string_form(&self) -> String {
        format!("{}:{} in {}", self.filename, self.lineno, self.function)
    }
}

/// Captured exception with an optional cause chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExceptionInfo {
    /// Exception type name (e.g. `std::io::Error`).
    pub type_name: String,
    pub message: String,
    /// Frames from outermost to innermost.
    pub frames: Vec<StackFrame>,
    /// The underlying cause, if any.
    pub cause: Option<Box<ExceptionInfo>>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_cause(mut self, cause: ExceptionInfo) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Capture `err` and its `source()` chain.
    ///
    /// Only the outermost error's concrete type is known; sources are recorded
    /// with the generic type name `Error`.
    pub fn from_error<E: Error + 'static>(err: &E) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(next) = source {
            chain.push(Self::new("Error", next.to_string()));
            source = next.source();
        }
        let cause = chain.into_iter().rev().fold(None, |inner, mut info: Self| {
            info.cause = inner.map(Box::new);
            Some(info)
        });
        Self {
            type_name: std::any::type_name::<E>().to_owned(),
            message: err.to_string(),
            frames: Vec::new(),
            cause: cause.map(Box::new),
        }
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

impl Reflectable for ExceptionInfo {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn fields(&self) -> Vec<(String, FieldValue)> {
        let mut fields = vec![
            ("type".into(), self.type_name.clone().into()),
            ("message".into(), self.message.clone().into()),
        ];
        if !self.frames.is_empty() {
            let frames = self
                .frames
                .iter()
                .cloned()
                .map(FieldValue::object)
                .collect();
            fields.push(("frames".into(), FieldValue::Seq(frames)));
        }
        if let Some(cause) = &self.cause {
            fields.push(("cause".into(), FieldValue::object((**cause).clone())));
        }
        fields
    }

    fn string_form(&self) -> String {
        self.to_string()
    }
}
