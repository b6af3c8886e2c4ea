#![forbid(unsafe_code)]

//! Expandable outline over a bounded tree summary.
//!
//! [`TreeOutline`] flattens a [`TreeNode`] into display rows, descending only
//! into expanded containers. Wherever the summary stopped early, the outline
//! adds an explicit "N more not shown" row after the children that are
//! present, so truncation is never silent.
//!
//! Nodes are addressed by their child-index path from the root (`[]` is the
//! root itself). The root starts expanded; everything else starts collapsed.

use std::collections::HashSet;

use jview_core::tree::{TRUNCATION_MARKER, TreeNode};
use jview_core::value::JsonKind;
use serde_json::Value;

/// Indentation per depth level in [`TreeOutline::render_lines`].
const INDENT: &str = "  ";
const EXPANDED_MARKER: &str = "▾ ";
const COLLAPSED_MARKER: &str = "▸ ";
const LEAF_MARKER: &str = "  ";

/// What a row shows.
#[derive(Debug, Clone, PartialEq)]
pub enum OutlineEntry<'a> {
    Node {
        node: &'a TreeNode,
        path: Vec<usize>,
        expanded: bool,
    },
    /// Entries of the parent container the summary left out.
    More { hidden: usize },
}

/// One visible row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineRow<'a> {
    pub depth: usize,
    pub entry: OutlineEntry<'a>,
}

impl OutlineRow<'_> {
    /// Row text without indentation or markers.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.entry {
            OutlineEntry::Node { node, .. } => node_label(node),
            OutlineEntry::More { hidden } => format!("{hidden} more not shown"),
        }
    }
}

/// `key: value` for leaves, `key {n}` / `key [n]` for containers.
///
/// A clipped string keeps its quotes around the kept text and shows the
/// marker after them: `key: "abc" …`.
#[must_use]
pub fn node_label(node: &TreeNode) -> String {
    match node.kind {
        JsonKind::Object => format!("{} {{{}}}", node.key, node.child_count.unwrap_or(0)),
        JsonKind::Array => format!("{} [{}]", node.key, node.child_count.unwrap_or(0)),
        JsonKind::String | JsonKind::Number | JsonKind::Boolean | JsonKind::Null => {
            match &node.value {
                Some(Value::String(text)) if node.value_clipped => {
                    let kept = text.strip_suffix(TRUNCATION_MARKER).unwrap_or(text);
                    let quoted = Value::String(kept.to_owned());
                    format!("{}: {quoted} {TRUNCATION_MARKER}", node.key)
                }
                Some(value) => format!("{}: {value}", node.key),
                None => node.key.clone(),
            }
        }
    }
}

/// Expansion state over a borrowed summary.
#[derive(Debug, Clone)]
pub struct TreeOutline<'a> {
    root: &'a TreeNode,
    expanded: HashSet<Vec<usize>>,
}

impl<'a> TreeOutline<'a> {
    #[must_use]
    pub fn new(root: &'a TreeNode) -> Self {
        let mut expanded = HashSet::new();
        if is_expandable(root) {
            expanded.insert(Vec::new());
        }
        Self { root, expanded }
    }

    #[must_use]
    pub fn root(&self) -> &'a TreeNode {
        self.root
    }

    /// The node at `path`, if the path exists in the summary.
    #[must_use]
    pub fn node_at(&self, path: &[usize]) -> Option<&'a TreeNode> {
        path.iter()
            .try_fold(self.root, |node, &index| node.present_children().get(index))
    }

    #[must_use]
    pub fn is_expanded(&self, path: &[usize]) -> bool {
        self.expanded.contains(path)
    }

    /// Expand the container at `path`. Returns false for leaves and bad paths.
    pub fn expand(&mut self, path: &[usize]) -> bool {
        match self.node_at(path) {
            Some(node) if is_expandable(node) => {
                self.expanded.insert(path.to_vec());
                true
            }
            _ => false,
        }
    }

    pub fn collapse(&mut self, path: &[usize]) -> bool {
        self.expanded.remove(path)
    }

    /// Flip the state at `path`. Returns the new expanded state.
    pub fn toggle(&mut self, path: &[usize]) -> bool {
        if self.collapse(path) {
            false
        } else {
            self.expand(path)
        }
    }

    /// Expand every container present in the summary.
    pub fn expand_all(&mut self) {
        fn walk(node: &TreeNode, path: &mut Vec<usize>, out: &mut HashSet<Vec<usize>>) {
            if !is_expandable(node) {
                return;
            }
            out.insert(path.clone());
            for (index, child) in node.present_children().iter().enumerate() {
                path.push(index);
                walk(child, path, out);
                path.pop();
            }
        }

        let mut path = Vec::new();
        walk(self.root, &mut path, &mut self.expanded);
    }

    /// Collapse everything, the root included.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Rows in display order.
    #[must_use]
    pub fn rows(&self) -> Vec<OutlineRow<'a>> {
        let mut rows = Vec::new();
        let mut path = Vec::new();
        self.flatten(self.root, 0, &mut path, &mut rows);
        rows
    }

    fn flatten(
        &self,
        node: &'a TreeNode,
        depth: usize,
        path: &mut Vec<usize>,
        rows: &mut Vec<OutlineRow<'a>>,
    ) {
        let expanded = self.expanded.contains(path.as_slice());
        rows.push(OutlineRow {
            depth,
            entry: OutlineEntry::Node {
                node,
                path: path.clone(),
                expanded,
            },
        });
        if !expanded {
            return;
        }
        for (index, child) in node.present_children().iter().enumerate() {
            path.push(index);
            self.flatten(child, depth + 1, path, rows);
            path.pop();
        }
        let hidden = node.hidden_children();
        if hidden > 0 {
            rows.push(OutlineRow {
                depth: depth + 1,
                entry: OutlineEntry::More { hidden },
            });
        }
    }

    /// Rows as indented text with expand markers.
    #[must_use]
    pub fn render_lines(&self) -> Vec<String> {
        self.rows()
            .iter()
            .map(|row| {
                let marker = match &row.entry {
                    OutlineEntry::Node { expanded: true, .. } => EXPANDED_MARKER,
                    OutlineEntry::Node { node, .. } if is_expandable(node) => COLLAPSED_MARKER,
                    OutlineEntry::Node { .. } | OutlineEntry::More { .. } => LEAF_MARKER,
                };
                format!("{}{marker}{}", INDENT.repeat(row.depth), row.label())
            })
            .collect()
    }
}

fn is_expandable(node: &TreeNode) -> bool {
    node.is_container() && node.child_count.unwrap_or(0) > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use jview_core::config::AnalysisConfig;
    use jview_core::tree::summarize;
    use serde_json::json;

    fn summary(value: &serde_json::Value, max_nodes: usize) -> TreeNode {
        summarize(value, &AnalysisConfig::default().with_max_tree_nodes(max_nodes)).tree
    }

    #[test]
    fn root_starts_expanded() {
        let tree = summary(&json!({"a": 1, "b": {"c": true}}), 100);
        let outline = TreeOutline::new(&tree);
        assert_eq!(
            outline.render_lines(),
            ["▾ root {2}", "    a: 1", "  ▸ b {1}"]
        );
    }

    #[test]
    fn expand_and_collapse() {
        let tree = summary(&json!({"a": 1, "b": {"c": "x"}}), 100);
        let mut outline = TreeOutline::new(&tree);
        assert!(outline.expand(&[1]));
        assert!(!outline.expand(&[0]));
        assert!(!outline.expand(&[7]));
        assert_eq!(outline.rows().len(), 4);
        assert_eq!(outline.rows()[3].label(), "c: \"x\"");
        assert!(!outline.toggle(&[1]));
        assert_eq!(outline.rows().len(), 3);
        assert!(outline.toggle(&[1]));
    }

    #[test]
    fn expand_all_then_collapse_all() {
        let tree = summary(&json!({"a": [1, [2, 3]], "b": {}}), 100);
        let mut outline = TreeOutline::new(&tree);
        outline.expand_all();
        // root, a, 0, 1, 1/0, 1/1, b
        assert_eq!(outline.rows().len(), 7);
        assert!(!outline.is_expanded(&[1]));
        outline.collapse_all();
        assert_eq!(outline.rows().len(), 1);
    }

    #[test]
    fn truncated_level_shows_more_row() {
        let numbers: Vec<u32> = (0..10).collect();
        let tree = summary(&json!(numbers), 4);
        let outline = TreeOutline::new(&tree);
        let rows = outline.rows();
        let last = rows.last().unwrap();
        assert_eq!(last.entry, OutlineEntry::More { hidden: 7 });
        assert_eq!(last.depth, 1);
        assert_eq!(last.label(), "7 more not shown");
    }

    #[test]
    fn cut_container_is_all_hidden() {
        let tree = summary(&json!({"a": 1, "b": [1, 2, 3]}), 2);
        let mut outline = TreeOutline::new(&tree);
        outline.expand_all();
        let labels: Vec<String> = outline.rows().iter().map(OutlineRow::label).collect();
        assert_eq!(labels, ["root {2}", "a: 1", "1 more not shown"]);
    }

    #[test]
    fn clipped_string_marker_sits_outside_quotes() {
        let long = "x".repeat(300);
        let tree = summary(&json!({"s": long, "t": "short"}), 100);
        let children = tree.children.as_ref().unwrap();
        assert!(children[0].value_clipped);

        let label = node_label(&children[0]);
        assert_eq!(label, format!("s: \"{}\" …", "x".repeat(200)));
        assert_eq!(node_label(&children[1]), "t: \"short\"");
    }

    #[test]
    fn node_lookup() {
        let tree = summary(&json!({"a": {"b": [null]}}), 100);
        let outline = TreeOutline::new(&tree);
        assert_eq!(outline.node_at(&[0, 0, 0]).unwrap().kind, JsonKind::Null);
        assert!(outline.node_at(&[1]).is_none());
    }
}
