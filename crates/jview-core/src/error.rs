#![forbid(unsafe_code)]

//! Analysis errors and best-effort line extraction.
//!
//! Every failure inside an analysis request is reduced to an [`AnalysisError`]
//! (`{ message, line? }`), which is what crosses the worker boundary as the
//! payload of an `ok: false` response.
//!
//! Line numbers come from the parser when it reports one (`serde_json` does).
//! For parsers that only describe the failure in prose, [`AnalysisError::from_parser_message`]
//! scans the message for an `at position N` byte offset or an explicit
//! `line N` reference. Both paths are heuristics over text that the parser
//! does not promise to keep stable, so `line` is always optional.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Error payload of a failed analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisError {
    /// Human-readable message with position annotations stripped.
    pub message: String,
    /// 1-based line of the failure in the source text, when derivable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl AnalysisError {
    /// Create an error with an explicit message and optional line.
    pub fn new(message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }

    /// Error for a failure that is not the input's fault (caught panic,
    /// serializer failure). Never carries a line.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    /// Convert a `serde_json` error, using its reported line when present.
    #[must_use]
    pub fn from_json_error(err: &serde_json::Error, source: &str) -> Self {
        let raw = err.to_string();
        if err.line() == 0 {
            return Self::from_parser_message(&raw, source);
        }
        let suffix = format!(" at line {} column {}", err.line(), err.column());
        let message = raw.strip_suffix(&suffix).unwrap_or(&raw).to_string();
        Self {
            message: non_empty(message, "invalid JSON"),
            line: Some(err.line()),
        }
    }

    /// Derive `{ message, line }` from a parser's free-form error message.
    ///
    /// `at position N` is read as a byte offset into `source` and converted
    /// by counting newlines before it; otherwise `line N` is taken verbatim.
    #[must_use]
    pub fn from_parser_message(message: &str, source: &str) -> Self {
        if let Some((offset, range)) = find_number_after(message, "at position ") {
            let head = &message[..range.start];
            let start = if head.ends_with(" in JSON ") {
                range.start - " in JSON ".len()
            } else if head.ends_with(' ') {
                range.start - 1
            } else {
                range.start
            };
            let mut cleaned = String::with_capacity(message.len());
            cleaned.push_str(&message[..start]);
            cleaned.push_str(&message[range.end..]);
            return Self {
                message: non_empty(cleaned.trim_end().to_string(), message),
                line: Some(line_at_offset(source, offset)),
            };
        }
        let line = find_number_after(message, "line ").map(|(n, _)| n);
        Self {
            message: non_empty(message.to_string(), "invalid JSON"),
            line,
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {line})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Text of a caught panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    match message.strip_prefix("internal error: entered unreachable code: ") {
        Some(stripped) => stripped.to_string(),
        None => message,
    }
}

/// 1-based line containing byte `offset` of `source`.
///
/// Offsets past the end resolve to the last line.
#[must_use]
pub fn line_at_offset(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    source.as_bytes()[..end]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

/// Find `needle` followed by decimal digits; returns the number and the
/// byte range of `needle + digits`.
fn find_number_after(haystack: &str, needle: &str) -> Option<(usize, std::ops::Range<usize>)> {
    let mut from = 0;
    while let Some(idx) = haystack[from..].find(needle) {
        let digits_start = from + idx + needle.len();
        let digits_len = haystack[digits_start..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if digits_len > 0 {
            let digits_end = digits_start + digits_len;
            if let Ok(n) = haystack[digits_start..digits_end].parse() {
                return Some((n, from + idx..digits_end));
            }
        }
        from = digits_start;
    }
    None
}

fn non_empty(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
