#![forbid(unsafe_code)]

//! JSON value kinds and document parsing.
//!
//! Documents are parsed once into [`serde_json::Value`], a closed enum of the
//! six JSON kinds. Everything downstream (summaries, graphs) matches on that
//! enum exhaustively, so "null" and "absent" can never be confused.
//! Object entries keep their source order.
//!
//! Nesting depth is not limited by the parser. Recursive passes over a value
//! go through [`ensure_stack`] or [`with_depth_stack`], and large values are
//! released with [`drop_deep`], so a deep document cannot overflow the
//! analysis thread's stack. Documents nested past [`MAX_NESTING_DEPTH`] are
//! refused before parsing.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AnalysisError;

/// The kind of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl JsonKind {
    /// Classify a parsed value.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Boolean,
            Value::Null => Self::Null,
        }
    }

    /// Whether values of this kind have children.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deepest nesting of objects and arrays a document may have.
pub const MAX_NESTING_DEPTH: usize = 10_000;

/// Remaining stack below which a recursive step moves to a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each stack segment allocated by [`ensure_stack`].
const STACK_SEGMENT: usize = 4 * 1024 * 1024;
/// Depth up to which [`with_depth_stack`] runs on the current stack.
const SHALLOW_DEPTH: usize = 128;
/// Stack reserved per nesting level for passes we cannot split up.
const STACK_PER_LEVEL: usize = 16 * 1024;

/// Parse JSON text into a value, reducing failures to an [`AnalysisError`].
///
/// Too-deep documents fail with an internal error that carries no line.
pub fn parse_document(source: &str) -> Result<Value, AnalysisError> {
    let depth = nesting_depth(source);
    if depth > MAX_NESTING_DEPTH {
        crate::warn!(depth, max = MAX_NESTING_DEPTH, "document nests too deep");
        return Err(AnalysisError::internal(format!(
            "document nests deeper than {MAX_NESTING_DEPTH} levels"
        )));
    }
    from_str_unbounded(source).map_err(|err| AnalysisError::from_json_error(&err, source))
}

/// `serde_json::from_str` without the recursion limit, growing the stack as
/// deserialization descends.
pub fn from_str_unbounded<T: DeserializeOwned>(source: &str) -> Result<T, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(source);
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

/// Deepest bracket nesting in `source`, ignoring brackets inside strings.
///
/// Works on any text, valid JSON or not.
#[must_use]
pub fn nesting_depth(source: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for byte in source.bytes() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

/// Nesting depth of a parsed value (a primitive is depth 0).
#[must_use]
pub fn value_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(value, 0usize)];
    while let Some((value, depth)) = pending.pop() {
        match value {
            Value::Array(items) => {
                deepest = deepest.max(depth + 1);
                pending.extend(items.iter().map(|v| (v, depth + 1)));
            }
            Value::Object(map) => {
                deepest = deepest.max(depth + 1);
                pending.extend(map.values().map(|v| (v, depth + 1)));
            }
            Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => {}
        }
    }
    deepest
}

/// Run one level of a recursive pass, moving to a new stack segment when
/// the current one is nearly used up.
#[inline]
pub fn ensure_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, f)
}

/// Run `f` on a stack sized for a value `depth` levels deep.
///
/// For recursive code outside this crate's control (serializers).
pub fn with_depth_stack<R>(depth: usize, f: impl FnOnce() -> R) -> R {
    if depth <= SHALLOW_DEPTH {
        f()
    } else {
        stacker::grow(
            depth.saturating_mul(STACK_PER_LEVEL).max(STACK_SEGMENT),
            f,
        )
    }
}

/// Drop a value without recursing into it.
pub fn drop_deep(value: Value) {
    let mut pending = vec![value];
    while let Some(value) = pending.pop() {
        match value {
            Value::Array(items) => pending.extend(items),
            Value::Object(map) => pending.extend(map.into_iter().map(|(_, v)| v)),
            Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => {}
        }
    }
}

/// Display text for a primitive: strings unquoted, everything else as JSON.
///
/// Containers render as a size hint (`[3]`, `{2}`).
#[must_use]
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => format!("[{}]", items.len()),
        Value::Object(map) => format!("{{{}}}", map.len()),
    }
}

/// Number of direct children of a container (0 for primitives).
#[must_use]
pub fn child_count(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.len(),
        Value::Array(items) => items.len(),
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => 0,
    }
}
