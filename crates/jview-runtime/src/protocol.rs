#![forbid(unsafe_code)]

//! Analysis wire protocol.
//!
//! Requests and responses are plain data, serialized as one JSON object per
//! line when they cross a process boundary:
//!
//! ```text
//! Request         { id, kind: "format"|"tree", sourceText, indent?: int|"minified" }
//! Response format { id, kind: "format", ok: true, lines, lineCount, byteSize, isLarge }
//! Response tree   { id, kind: "tree",   ok: true, tree, totalNodesVisited, truncated }
//! Response error  { id, kind, ok: false, error: { message, line? } }
//! ```
//!
//! In memory a response holds a `Result`, so "ok with an error" or "failed
//! without one" cannot be represented.

use std::fmt;

use jview_core::error::AnalysisError;
use jview_core::format::{FormattedDocument, IndentSpec};
use jview_core::tree::{TreeNode, TreeSummary};
use jview_core::value::from_str_unbounded;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};

/// Correlation id of a request, unique and increasing per [`RequestKind`].
pub type RequestId = u64;

/// Request category. Supersession is tracked per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Format,
    Tree,
}

impl RequestKind {
    pub const ALL: [Self; 2] = [Self::Format, Self::Tree];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Tree => "tree",
        }
    }

    /// Dense index for per-kind tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Format => 0,
            Self::Tree => 1,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work for the analysis side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub id: RequestId,
    pub kind: RequestKind,
    pub source_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<IndentSpec>,
}

impl AnalysisRequest {
    pub fn format(id: RequestId, source_text: impl Into<String>, indent: IndentSpec) -> Self {
        Self {
            id,
            kind: RequestKind::Format,
            source_text: source_text.into(),
            indent: Some(indent),
        }
    }

    pub fn tree(id: RequestId, source_text: impl Into<String>) -> Self {
        Self {
            id,
            kind: RequestKind::Tree,
            source_text: source_text.into(),
            indent: None,
        }
    }
}

/// Reply to an [`AnalysisRequest`], carrying the same id and kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnalysisResponse {
    Format(FormatResponse),
    Tree(TreeResponse),
}

impl AnalysisResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Format(r) => r.id,
            Self::Tree(r) => r.id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Format(_) => RequestKind::Format,
            Self::Tree(_) => RequestKind::Tree,
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error().is_none()
    }

    #[must_use]
    pub fn error(&self) -> Option<&AnalysisError> {
        match self {
            Self::Format(r) => r.result.as_ref().err(),
            Self::Tree(r) => r.result.as_ref().err(),
        }
    }

    /// A failed response of `kind`.
    #[must_use]
    pub fn failure(id: RequestId, kind: RequestKind, error: AnalysisError) -> Self {
        match kind {
            RequestKind::Format => Self::Format(FormatResponse {
                id,
                result: Err(error),
            }),
            RequestKind::Tree => Self::Tree(TreeResponse {
                id,
                result: Err(error),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "FormatWire")]
pub struct FormatResponse {
    pub id: RequestId,
    pub result: Result<FormattedDocument, AnalysisError>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "TreeWire")]
pub struct TreeResponse {
    pub id: RequestId,
    pub result: Result<TreeSummary, AnalysisError>,
}

// ── Wire forms ───────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FormatOkRef<'a> {
    id: RequestId,
    ok: bool,
    lines: &'a [String],
    line_count: usize,
    byte_size: usize,
    is_large: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TreeOkRef<'a> {
    id: RequestId,
    ok: bool,
    tree: &'a TreeNode,
    total_nodes_visited: usize,
    truncated: bool,
}

#[derive(Serialize)]
struct FailureRef<'a> {
    id: RequestId,
    ok: bool,
    error: &'a AnalysisError,
}

impl Serialize for FormatResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.result {
            Ok(doc) => FormatOkRef {
                id: self.id,
                ok: true,
                lines: &doc.lines,
                line_count: doc.line_count,
                byte_size: doc.byte_size,
                is_large: doc.is_large,
            }
            .serialize(serializer),
            Err(error) => FailureRef {
                id: self.id,
                ok: false,
                error,
            }
            .serialize(serializer),
        }
    }
}

impl Serialize for TreeResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.result {
            Ok(summary) => TreeOkRef {
                id: self.id,
                ok: true,
                tree: &summary.tree,
                total_nodes_visited: summary.total_nodes_visited,
                truncated: summary.truncated,
            }
            .serialize(serializer),
            Err(error) => FailureRef {
                id: self.id,
                ok: false,
                error,
            }
            .serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormatWire {
    id: RequestId,
    ok: bool,
    lines: Option<Vec<String>>,
    line_count: Option<usize>,
    byte_size: Option<usize>,
    is_large: Option<bool>,
    error: Option<AnalysisError>,
}

impl TryFrom<FormatWire> for FormatResponse {
    type Error = String;

    fn try_from(wire: FormatWire) -> Result<Self, Self::Error> {
        let result = if wire.ok {
            let lines = wire.lines.ok_or("format response missing lines")?;
            Ok(FormattedDocument {
                line_count: wire.line_count.unwrap_or(lines.len()),
                byte_size: wire.byte_size.ok_or("format response missing byteSize")?,
                is_large: wire.is_large.unwrap_or(false),
                lines,
            })
        } else {
            Err(wire.error.ok_or("failed response missing error")?)
        };
        Ok(Self {
            id: wire.id,
            result,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeWire {
    id: RequestId,
    ok: bool,
    tree: Option<TreeNode>,
    total_nodes_visited: Option<usize>,
    truncated: Option<bool>,
    error: Option<AnalysisError>,
}

impl TryFrom<TreeWire> for TreeResponse {
    type Error = String;

    fn try_from(wire: TreeWire) -> Result<Self, Self::Error> {
        let result = if wire.ok {
            Ok(TreeSummary {
                tree: wire.tree.ok_or("tree response missing tree")?,
                total_nodes_visited: wire
                    .total_nodes_visited
                    .ok_or("tree response missing totalNodesVisited")?,
                truncated: wire.truncated.unwrap_or(false),
            })
        } else {
            Err(wire.error.ok_or("failed response missing error")?)
        };
        Ok(Self {
            id: wire.id,
            result,
        })
    }
}

// ── NDJSON codec ─────────────────────────────────────────────────────

/// A message that could not be encoded or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Inbound text is not a valid message.
    Malformed(String),
    /// A message could not be serialized.
    Encode(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed message: {msg}"),
            Self::Encode(msg) => write!(f, "cannot encode message: {msg}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

fn encode<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(|err| ProtocolError::Encode(err.to_string()))
}

fn decode<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(ProtocolError::Malformed("empty line".to_string()));
    }
    from_str_unbounded(line).map_err(|err| ProtocolError::Malformed(err.to_string()))
}

/// Encode a request as one line of JSON (no trailing newline).
pub fn encode_request(request: &AnalysisRequest) -> Result<String, ProtocolError> {
    encode(request)
}

pub fn decode_request(line: &str) -> Result<AnalysisRequest, ProtocolError> {
    decode(line)
}

/// Encode a response as one line of JSON (no trailing newline).
pub fn encode_response(response: &AnalysisResponse) -> Result<String, ProtocolError> {
    encode(response)
}

pub fn decode_response(line: &str) -> Result<AnalysisResponse, ProtocolError> {
    decode(line)
}
