#![forbid(unsafe_code)]

//! Document formatting into a line array.
//!
//! The formatted text is split into lines here, on the analysis side, so that
//! a renderer only ever receives pre-split lines and never runs a
//! whole-document split on its own thread.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::value::{drop_deep, parse_document, value_depth, with_depth_stack};

/// Widest indent accepted; larger widths clamp.
pub const MAX_INDENT: u8 = 10;

/// How formatted output is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "IndentWire", into = "IndentWire")]
pub enum IndentSpec {
    /// Pretty-printed with this many spaces per level (1..=10).
    Spaces(u8),
    /// No whitespace at all.
    Minified,
}

impl Default for IndentSpec {
    fn default() -> Self {
        Self::Spaces(2)
    }
}

impl IndentSpec {
    /// Indent from a width. Zero means minified; widths past [`MAX_INDENT`] clamp.
    #[must_use]
    pub fn spaces(width: u64) -> Self {
        match width {
            0 => Self::Minified,
            w => Self::Spaces(w.min(u64::from(MAX_INDENT)) as u8),
        }
    }

    /// Parse the user-facing spelling: a width, `minify`, or `minified`.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("minify") || trimmed.eq_ignore_ascii_case("minified") {
            return Some(Self::Minified);
        }
        trimmed.parse::<u64>().ok().map(Self::spaces)
    }

    #[must_use]
    pub const fn is_minified(self) -> bool {
        matches!(self, Self::Minified)
    }
}

impl fmt::Display for IndentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spaces(n) => write!(f, "{n}"),
            Self::Minified => f.write_str("minified"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum IndentWire {
    Width(u64),
    Keyword(String),
}

impl TryFrom<IndentWire> for IndentSpec {
    type Error = String;

    fn try_from(wire: IndentWire) -> Result<Self, Self::Error> {
        match wire {
            IndentWire::Width(n) => Ok(Self::spaces(n)),
            IndentWire::Keyword(word) => {
                Self::parse(&word).ok_or_else(|| format!("invalid indent {word:?}"))
            }
        }
    }
}

impl From<IndentSpec> for IndentWire {
    fn from(spec: IndentSpec) -> Self {
        match spec {
            IndentSpec::Spaces(n) => Self::Width(u64::from(n)),
            IndentSpec::Minified => Self::Keyword("minified".to_string()),
        }
    }
}

/// Formatted output of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedDocument {
    pub lines: Vec<String>,
    pub line_count: usize,
    /// UTF-8 length of the serialized text.
    pub byte_size: usize,
    pub is_large: bool,
}

impl FormattedDocument {
    fn from_text(text: &str, config: &AnalysisConfig) -> Self {
        let lines: Vec<String> = text.split('\n').map(str::to_owned).collect();
        Self {
            line_count: lines.len(),
            byte_size: text.len(),
            is_large: text.len() > config.large_file_threshold,
            lines,
        }
    }

    /// Rejoin the lines into the serialized text.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Serialize a parsed value per `indent` into text.
pub fn to_text(value: &Value, indent: IndentSpec) -> Result<String, AnalysisError> {
    match indent {
        IndentSpec::Minified => serde_json::to_string(value)
            .map_err(|err| AnalysisError::internal(format!("serialization failed: {err}"))),
        IndentSpec::Spaces(width) => {
            let indent = vec![b' '; usize::from(width)];
            let mut buf = Vec::with_capacity(128);
            let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(&indent));
            value
                .serialize(&mut ser)
                .map_err(|err| AnalysisError::internal(format!("serialization failed: {err}")))?;
            String::from_utf8(buf)
                .map_err(|err| AnalysisError::internal(format!("serializer produced invalid UTF-8: {err}")))
        }
    }
}

/// Format an already parsed value.
pub fn format_value(
    value: &Value,
    indent: IndentSpec,
    config: &AnalysisConfig,
) -> Result<FormattedDocument, AnalysisError> {
    let text = with_depth_stack(value_depth(value), || to_text(value, indent))?;
    Ok(FormattedDocument::from_text(&text, config))
}

/// Parse and format source text.
pub fn format_text(
    source: &str,
    indent: IndentSpec,
    config: &AnalysisConfig,
) -> Result<FormattedDocument, AnalysisError> {
    let _span = crate::debug_span!("format_text", bytes = source.len()).entered();
    let value = parse_document(source)?;
    let doc = format_value(&value, indent, config);
    drop_deep(value);
    let doc = doc?;
    crate::debug!(
        line_count = doc.line_count,
        byte_size = doc.byte_size,
        is_large = doc.is_large,
        "formatted document"
    );
    Ok(doc)
}
