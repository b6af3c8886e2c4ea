#![forbid(unsafe_code)]

//! JSON to node/edge graph conversion.
//!
//! One [`GraphNode`] per object or array (plus one for a primitive root).
//! Primitive members of a container are folded into that node's
//! `inline_properties` instead of becoming nodes; a graph with one node per
//! scalar is unreadable at any real size. Container members become child
//! nodes joined by a [`GraphEdge`] labelled with the member key (array
//! elements are unlabelled).
//!
//! Nodes are numbered in depth-first pre-order (`n-0` is the root). No budget
//! is applied here: cost is linear in the number of containers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::{ROOT_PATH, array_child_path, object_child_path};
use crate::tree::ROOT_KEY;
use crate::value::{JsonKind, display_text, ensure_stack};

/// Estimated node width handed to layout.
pub const NODE_WIDTH: f64 = 220.0;
/// Header part of a node's estimated height.
pub const HEADER_HEIGHT: f64 = 40.0;
/// Height added per inline property row.
pub const ROW_HEIGHT: f64 = 28.0;
/// Padding below the last inline row.
pub const FOOTER_HEIGHT: f64 = 10.0;
/// Height of a primitive root, or an array without inline rows.
pub const PLAIN_HEIGHT: f64 = 60.0;

/// A primitive member shown inside its parent's node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineProperty {
    pub key: String,
    /// Display text: strings unquoted, other primitives as JSON literals.
    pub value: String,
    pub kind: JsonKind,
}

/// Top-left corner assigned by layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_edge_label: Option<String>,
    pub kind: JsonKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_count: Option<usize>,
    /// Display value of a primitive root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub estimated_width: f64,
    pub estimated_height: f64,
    pub inline_properties: Vec<InlineProperty>,
    pub path_expression: String,
    /// Written by layout; `None` until then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NodePosition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl JsonGraph {
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Nodes reached by an edge out of `id`, in edge order.
    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphNode> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.source == id)
            .filter_map(|edge| self.node(&edge.target))
    }

    #[must_use]
    pub fn is_positioned(&self) -> bool {
        self.nodes.iter().all(|node| node.position.is_some())
    }
}

/// Estimated height for a node showing `rows` inline properties.
#[must_use]
pub fn estimated_height(rows: usize) -> f64 {
    HEADER_HEIGHT + ROW_HEIGHT * rows as f64 + FOOTER_HEIGHT
}

/// Objects always get a header and footer; arrays only once they have rows.
fn node_height(kind: JsonKind, rows: usize) -> f64 {
    match kind {
        JsonKind::Object => estimated_height(rows),
        JsonKind::Array if rows > 0 => estimated_height(rows),
        _ => PLAIN_HEIGHT,
    }
}

/// Build the node/edge graph of a parsed document.
#[must_use]
pub fn build_graph(value: &Value) -> JsonGraph {
    let _span = crate::debug_span!("build_graph").entered();
    let mut builder = GraphBuilder::default();
    builder.visit(None, value, None, ROOT_PATH.to_string());
    crate::debug!(
        nodes = builder.graph.nodes.len(),
        edges = builder.graph.edges.len(),
        "graph built"
    );
    builder.graph
}

#[derive(Default)]
struct GraphBuilder {
    graph: JsonGraph,
    next_id: usize,
}

impl GraphBuilder {
    fn allocate_id(&mut self) -> String {
        let id = format!("n-{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// Add the node for `value` and recurse into container members.
    ///
    /// `key` is `None` only for the root. `parent` carries the parent id and
    /// the edge label (`None` for array elements).
    fn visit(
        &mut self,
        key: Option<&str>,
        value: &Value,
        parent: Option<(&str, Option<&str>)>,
        path: String,
    ) {
        ensure_stack(|| self.visit_node(key, value, parent, path));
    }

    fn visit_node(
        &mut self,
        key: Option<&str>,
        value: &Value,
        parent: Option<(&str, Option<&str>)>,
        path: String,
    ) {
        let id = self.allocate_id();
        let kind = JsonKind::of(value);
        let edge_label = parent.and_then(|(_, label)| label).map(str::to_owned);

        let (label, child_count, node_value, inline_properties) = match value {
            Value::Object(map) => (
                key.unwrap_or(ROOT_KEY).to_string(),
                Some(map.len()),
                None,
                inline_rows(map.iter().map(|(k, v)| (k.clone(), v))),
            ),
            Value::Array(items) => (
                match key {
                    Some(key) => format!("{key} [{}]", items.len()),
                    None => format!("Array [{}]", items.len()),
                },
                Some(items.len()),
                None,
                inline_rows(items.iter().enumerate().map(|(i, v)| (i.to_string(), v))),
            ),
            Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => (
                key.unwrap_or(ROOT_KEY).to_string(),
                None,
                Some(display_text(value)),
                Vec::new(),
            ),
        };

        if let Some((parent_id, _)) = parent {
            self.graph.edges.push(GraphEdge {
                id: format!("e-{parent_id}-{id}"),
                source: parent_id.to_string(),
                target: id.clone(),
                label: edge_label.clone(),
            });
        }

        self.graph.nodes.push(GraphNode {
            id: id.clone(),
            label,
            parent_edge_label: edge_label,
            kind,
            child_count,
            value: node_value,
            estimated_width: NODE_WIDTH,
            estimated_height: node_height(kind, inline_properties.len()),
            inline_properties,
            path_expression: path.clone(),
            position: None,
        });

        match value {
            Value::Object(map) => {
                for (child_key, child) in map.iter().filter(|(_, v)| is_container(v)) {
                    let child_path = object_child_path(&path, child_key);
                    self.visit(
                        Some(child_key.as_str()),
                        child,
                        Some((id.as_str(), Some(child_key.as_str()))),
                        child_path,
                    );
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate().filter(|(_, v)| is_container(v)) {
                    let child_key = index.to_string();
                    let child_path = array_child_path(&path, index);
                    self.visit(
                        Some(child_key.as_str()),
                        child,
                        Some((id.as_str(), None)),
                        child_path,
                    );
                }
            }
            Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => {}
        }
    }
}

fn is_container(value: &Value) -> bool {
    JsonKind::of(value).is_container()
}

fn inline_rows<'a, I>(entries: I) -> Vec<InlineProperty>
where
    I: Iterator<Item = (String, &'a Value)>,
{
    entries
        .filter(|(_, v)| !is_container(v))
        .map(|(key, v)| InlineProperty {
            key,
            value: display_text(v),
            kind: JsonKind::of(v),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_object_scenario() {
        let graph = build_graph(&json!({"x": 1, "y": {"z": 2}}));
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);

        let root = &graph.nodes[0];
        assert_eq!(root.id, "n-0");
        assert_eq!(root.path_expression, "$");
        assert_eq!(
            root.inline_properties,
            [InlineProperty {
                key: "x".into(),
                value: "1".into(),
                kind: JsonKind::Number
            }]
        );

        let child = &graph.nodes[1];
        assert_eq!(child.label, "y");
        assert_eq!(child.parent_edge_label.as_deref(), Some("y"));
        assert_eq!(child.path_expression, "$.y");
        assert_eq!(child.inline_properties[0].key, "z");
        assert_eq!(child.inline_properties[0].value, "2");

        let edge = &graph.edges[0];
        assert_eq!(edge.id, "e-n-0-n-1");
        assert_eq!((edge.source.as_str(), edge.target.as_str()), ("n-0", "n-1"));
        assert_eq!(edge.label.as_deref(), Some("y"));
    }

    #[test]
    fn primitive_root_carries_value() {
        let graph = build_graph(&json!("hello"));
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
        let node = &graph.nodes[0];
        assert_eq!(node.kind, JsonKind::String);
        assert_eq!(node.value.as_deref(), Some("hello"));
        assert!(node.inline_properties.is_empty());
        assert_eq!(node.estimated_height, PLAIN_HEIGHT);
    }

    #[test]
    fn arrays_fold_primitives_and_link_containers() {
        let graph = build_graph(&json!({"list": [1, "two", null, {"k": false}, [3]]}));
        let list = graph.node("n-1").unwrap();
        assert_eq!(list.label, "list [5]");
        assert_eq!(list.child_count, Some(5));
        assert_eq!(list.path_expression, "$.list");
        let values: Vec<&str> = list.inline_properties.iter().map(|p| p.value.as_str()).collect();
        assert_eq!(values, ["1", "two", "null"]);
        let keys: Vec<&str> = list.inline_properties.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["0", "1", "2"]);

        let children: Vec<&GraphNode> = graph.children_of("n-1").collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].path_expression, "$.list[3]");
        assert_eq!(children[0].parent_edge_label, None);
        assert_eq!(children[1].label, "4 [1]");
        assert_eq!(children[1].path_expression, "$.list[4]");
        assert!(graph.edges.iter().filter(|e| e.source == "n-1").all(|e| e.label.is_none()));
    }

    #[test]
    fn root_array_label() {
        let graph = build_graph(&json!([{"a": 1}]));
        assert_eq!(graph.nodes[0].label, "Array [1]");
        assert_eq!(graph.nodes[1].label, "0");
    }

    #[test]
    fn bracket_paths_for_non_identifier_keys() {
        let graph = build_graph(&json!({"first name": {"ok": true}}));
        assert_eq!(graph.nodes[1].path_expression, r#"$["first name"]"#);
    }

    #[test]
    fn height_tracks_inline_rows() {
        assert_eq!(estimated_height(0), 50.0);
        assert_eq!(estimated_height(1), 78.0);
        assert_eq!(estimated_height(3), 134.0);
        let graph = build_graph(&json!({"a": 1, "b": 2, "c": {}}));
        assert_eq!(graph.nodes[0].estimated_height, 106.0);
        assert_eq!(graph.nodes[1].estimated_height, 50.0);
        assert!(graph.nodes.iter().all(|n| n.estimated_width == NODE_WIDTH));
    }

    #[test]
    fn objects_without_rows_keep_header_height() {
        let graph = build_graph(&json!({"a": {"b": {}}}));
        assert!(graph.nodes.iter().all(|n| n.estimated_height == 50.0));

        let graph = build_graph(&json!([[1, 2], [[]]]));
        let heights: Vec<f64> = graph.nodes.iter().map(|n| n.estimated_height).collect();
        assert_eq!(heights, [PLAIN_HEIGHT, 106.0, PLAIN_HEIGHT, PLAIN_HEIGHT]);
    }

    #[test]
    fn deep_nesting_builds_one_node_per_level() {
        let depth = 1_000;
        let source = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let value = crate::value::parse_document(&source).unwrap();
        let graph = ensure_stack(|| build_graph(&value));
        assert_eq!(graph.nodes.len(), depth);
        assert_eq!(graph.edges.len(), depth - 1);
        crate::value::drop_deep(value);
    }

    #[test]
    fn ids_are_preorder() {
        let graph = build_graph(&json!({"a": {"b": {}}, "c": []}));
        let labels: Vec<(&str, &str)> = graph
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n.label.as_str()))
            .collect();
        assert_eq!(labels, [("n-0", "root"), ("n-1", "a"), ("n-2", "b"), ("n-3", "c [0]")]);
        assert!(!graph.is_positioned());
    }
}
