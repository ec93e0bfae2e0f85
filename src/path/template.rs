//! Pre-parsed path templates.
//!
//! A template such as `/tiles/{layer}/{z}-{x}-{y}-{filename}` is split once
//! into literal runs and field slots. Rendering writes request fields into the
//! slots without re-scanning substituted text, so a filename that itself
//! contains `{x}` is written verbatim.
//!
//! Each placeholder is substituted at its first occurrence only. Any repeat of
//! the same placeholder stays in the output as literal text.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use crate::request::TileRequest;

/// A request field that can appear in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateField {
    Layer,
    Filename,
    X,
    Y,
    Z,
}

impl TemplateField {
    const ALL: [TemplateField; 5] = [
        TemplateField::Layer,
        TemplateField::Filename,
        TemplateField::X,
        TemplateField::Y,
        TemplateField::Z,
    ];

    /// The placeholder text for this field, braces included.
    pub fn placeholder(self) -> &'static str {
        match self {
            TemplateField::Layer => "{layer}",
            TemplateField::Filename => "{filename}",
            TemplateField::X => "{x}",
            TemplateField::Y => "{y}",
            TemplateField::Z => "{z}",
        }
    }

    fn write_value(self, request: &TileRequest, out: &mut OsString) {
        match self {
            TemplateField::Layer => out.push(&request.layer),
            TemplateField::Filename => out.push(&request.filename),
            TemplateField::X => out.push(request.x.to_string()),
            TemplateField::Y => out.push(request.y.to_string()),
            TemplateField::Z => out.push(request.z.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(TemplateField),
}

/// A path template parsed into literal and field segments.
#[derive(Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template string.
    ///
    /// Parsing never fails: text that is not a recognised placeholder is kept
    /// as a literal.
    pub fn parse(template: impl Into<String>) -> Self {
        let source = template.into();

        // Placeholders contain no braces, so first occurrences never overlap.
        let mut slots: Vec<(usize, TemplateField)> = TemplateField::ALL
            .iter()
            .filter_map(|&field| source.find(field.placeholder()).map(|pos| (pos, field)))
            .collect();
        slots.sort_by_key(|&(pos, _)| pos);

        let mut segments = Vec::with_capacity(slots.len() * 2 + 1);
        let mut cursor = 0;
        for (pos, field) in slots {
            if pos > cursor {
                segments.push(Segment::Literal(source[cursor..pos].to_string()));
            }
            segments.push(Segment::Field(field));
            cursor = pos + field.placeholder().len();
        }
        if cursor < source.len() {
            segments.push(Segment::Literal(source[cursor..].to_string()));
        }

        Self { source, segments }
    }

    /// The original template text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Fields referenced by this template, in template order.
    pub fn fields(&self) -> impl Iterator<Item = TemplateField> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(field) => Some(*field),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute the request's fields into the template.
    pub fn render(&self, request: &TileRequest) -> PathBuf {
        let mut out = OsString::with_capacity(self.source.len() + request.filename.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push(text),
                Segment::Field(field) => field.write_value(request, &mut out),
            }
        }
        PathBuf::from(out)
    }
}

impl fmt::Debug for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathTemplate").field(&self.source).finish()
    }
}

impl From<&str> for PathTemplate {
    fn from(template: &str) -> Self {
        Self::parse(template)
    }
}

impl From<String> for PathTemplate {
    fn from(template: String) -> Self {
        Self::parse(template)
    }
}
