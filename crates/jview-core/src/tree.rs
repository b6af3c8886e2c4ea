#![forbid(unsafe_code)]

//! Bounded tree summaries.
//!
//! [`summarize`] turns a parsed value into a [`TreeNode`] hierarchy in one
//! depth-first pass. A single [`VisitBudget`] is threaded through the whole
//! traversal by `&mut`, so the node cap is global rather than per branch:
//!
//! - every node (the root included) is counted before its children,
//! - the budget is checked before each child is visited,
//! - a container reached after the budget ran out keeps its true
//!   `child_count` but gets no `children` and `truncated = true`.
//!
//! # Invariants
//!
//! 1. `child_count` of a container always equals the source entry count.
//! 2. `total_nodes_visited` never exceeds `max(max_nodes, 1)`.
//! 3. `children.len() <= child_count`, with `truncated` set whenever it is
//!    strictly less.
//! 4. Clipped strings are flagged with `value_clipped`; the trailing
//!    [`TRUNCATION_MARKER`] is display text, not data.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::value::{JsonKind, drop_deep, ensure_stack, parse_document};

/// Key given to the root node.
pub const ROOT_KEY: &str = "root";

/// Appended to clipped string previews.
pub const TRUNCATION_MARKER: char = '…';

/// Global node budget for one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitBudget {
    visited: usize,
    limit: usize,
}

impl VisitBudget {
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self { visited: 0, limit }
    }

    /// Count one node.
    #[inline]
    pub fn visit(&mut self) {
        self.visited += 1;
    }

    #[inline]
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.visited >= self.limit
    }

    #[inline]
    #[must_use]
    pub const fn visited(&self) -> usize {
        self.visited
    }

    #[inline]
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

/// One node of a bounded summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Property name, or the stringified index for array elements.
    pub key: String,
    pub kind: JsonKind,
    /// Primitive value for leaves. Strings may be clipped.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub value_clipped: bool,
    /// True number of entries for containers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    #[serde(default)]
    pub truncated: bool,
}

/// A present `value` field is `Some` even when it holds JSON `null`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl TreeNode {
    #[must_use]
    pub const fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    /// Children present in the summary (empty for leaves and cut containers).
    #[must_use]
    pub fn present_children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Entries of this container that the summary does not include.
    #[must_use]
    pub fn hidden_children(&self) -> usize {
        self.child_count
            .unwrap_or(0)
            .saturating_sub(self.present_children().len())
    }

    /// Number of nodes in this subtree, this node included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self
            .present_children()
            .iter()
            .map(TreeNode::node_count)
            .sum::<usize>()
    }

    fn leaf(key: String, kind: JsonKind, value: Value, value_clipped: bool) -> Self {
        Self {
            key,
            kind,
            value: Some(value),
            value_clipped,
            child_count: None,
            children: None,
            truncated: false,
        }
    }
}

/// Result of summarizing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSummary {
    pub tree: TreeNode,
    pub total_nodes_visited: usize,
    pub truncated: bool,
}

/// Summarize `value` under the budget and preview length in `config`.
#[must_use]
pub fn summarize(value: &Value, config: &AnalysisConfig) -> TreeSummary {
    let _span = crate::debug_span!("summarize", max_nodes = config.max_tree_nodes).entered();
    let mut budget = VisitBudget::new(config.max_tree_nodes);
    let tree = summarize_node(ROOT_KEY.to_string(), value, &mut budget, config.max_string_preview);
    let truncated = budget.visited() >= config.max_tree_nodes;
    crate::debug!(
        total_nodes_visited = budget.visited(),
        truncated,
        "tree summarized"
    );
    TreeSummary {
        tree,
        total_nodes_visited: budget.visited(),
        truncated,
    }
}

/// Parse and summarize source text.
pub fn summarize_text(source: &str, config: &AnalysisConfig) -> Result<TreeSummary, AnalysisError> {
    let value = parse_document(source)?;
    let summary = summarize(&value, config);
    drop_deep(value);
    Ok(summary)
}

/// Summarize one value, charging every created node to `budget`.
pub fn summarize_node(
    key: String,
    value: &Value,
    budget: &mut VisitBudget,
    max_preview: usize,
) -> TreeNode {
    ensure_stack(|| summarize_value(key, value, budget, max_preview))
}

fn summarize_value(
    key: String,
    value: &Value,
    budget: &mut VisitBudget,
    max_preview: usize,
) -> TreeNode {
    budget.visit();
    match value {
        Value::Object(map) => summarize_container(
            key,
            JsonKind::Object,
            map.len(),
            map.iter().map(|(k, v)| (k.clone(), v)),
            budget,
            max_preview,
        ),
        Value::Array(items) => summarize_container(
            key,
            JsonKind::Array,
            items.len(),
            items.iter().enumerate().map(|(i, v)| (i.to_string(), v)),
            budget,
            max_preview,
        ),
        Value::String(s) => match clip(s, max_preview) {
            Some(clipped) => TreeNode::leaf(key, JsonKind::String, Value::String(clipped), true),
            None => TreeNode::leaf(key, JsonKind::String, value.clone(), false),
        },
        Value::Number(_) => TreeNode::leaf(key, JsonKind::Number, value.clone(), false),
        Value::Bool(_) => TreeNode::leaf(key, JsonKind::Boolean, value.clone(), false),
        Value::Null => TreeNode::leaf(key, JsonKind::Null, Value::Null, false),
    }
}

fn summarize_container<'a, I>(
    key: String,
    kind: JsonKind,
    child_count: usize,
    entries: I,
    budget: &mut VisitBudget,
    max_preview: usize,
) -> TreeNode
where
    I: Iterator<Item = (String, &'a Value)>,
{
    let mut node = TreeNode {
        key,
        kind,
        value: None,
        value_clipped: false,
        child_count: Some(child_count),
        children: None,
        truncated: false,
    };

    if child_count == 0 {
        node.children = Some(Vec::new());
        return node;
    }
    if budget.is_exhausted() {
        node.truncated = true;
        return node;
    }

    let mut children = Vec::with_capacity(child_count.min(budget.limit() - budget.visited()));
    for (child_key, child) in entries {
        if budget.is_exhausted() {
            node.truncated = true;
            break;
        }
        children.push(summarize_node(child_key, child, budget, max_preview));
    }
    node.children = Some(children);
    node
}

/// Clip `s` to `max_chars` characters plus the marker, if it is longer.
fn clip(s: &str, max_chars: usize) -> Option<String> {
    let (cut, _) = s.char_indices().nth(max_chars)?;
    let mut clipped = String::with_capacity(cut + TRUNCATION_MARKER.len_utf8());
    clipped.push_str(&s[..cut]);
    clipped.push(TRUNCATION_MARKER);
    Some(clipped)
}
