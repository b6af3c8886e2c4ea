#![forbid(unsafe_code)]

//! Graph layout for JSON graphs.
//!
//! [`LayoutEngine`] is the contract: sized nodes and directed edges in, one
//! `(x, y)` per node out. [`LayeredLayout`] is the bundled implementation.
//!
//! Callers go through [`layout_or_degenerate`] (or [`apply_layout`]), which
//! never fails. If the engine errors or panics, every node is placed at the
//! origin and the error is kept on the [`LayoutOutcome`] for diagnostics.
//! Layout failure is cosmetic; it never stops a graph from being shown.

pub mod layered;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use jview_core::graph::{JsonGraph, NodePosition};
use jview_core::panic_message;

pub use layered::{LayeredLayout, LayoutDirection, LayoutSpacing};

/// A node to place, with its size.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNodeSpec {
    pub id: String,
    pub width: f64,
    pub height: f64,
}

/// A directed edge between two node ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEdgeSpec {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Top-left corner assigned to one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePlacement {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// Why a layout could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// An edge names a node id that is not in the node list.
    UnknownEndpoint { edge: String, node: String },
    /// Two nodes share an id.
    DuplicateNode(String),
    /// A node width or height is NaN, infinite, or negative.
    InvalidSize { node: String, width: f64, height: f64 },
    /// The engine returned no usable position for a node.
    MissingPlacement(String),
    /// The engine panicked.
    Panicked(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEndpoint { edge, node } => {
                write!(f, "edge {edge} references unknown node {node}")
            }
            Self::DuplicateNode(id) => write!(f, "duplicate node id {id}"),
            Self::InvalidSize {
                node,
                width,
                height,
            } => write!(f, "node {node} has invalid size {width}x{height}"),
            Self::MissingPlacement(id) => write!(f, "no position computed for node {id}"),
            Self::Panicked(msg) => write!(f, "layout panicked: {msg}"),
        }
    }
}

impl std::error::Error for LayoutError {}

/// A layered-graph placement algorithm.
pub trait LayoutEngine {
    /// Place every node. The result must contain one entry per input node.
    fn layout(
        &self,
        nodes: &[LayoutNodeSpec],
        edges: &[LayoutEdgeSpec],
    ) -> Result<Vec<NodePlacement>, LayoutError>;

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "layout"
    }
}

/// Placements plus the error that forced a degenerate result, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOutcome {
    pub placements: Vec<NodePlacement>,
    pub error: Option<LayoutError>,
}

impl LayoutOutcome {
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.error.is_some()
    }
}

/// Run `engine`, falling back to all-zero positions on error or panic.
pub fn layout_or_degenerate<E>(
    engine: &E,
    nodes: &[LayoutNodeSpec],
    edges: &[LayoutEdgeSpec],
) -> LayoutOutcome
where
    E: LayoutEngine + ?Sized,
{
    let result = catch_unwind(AssertUnwindSafe(|| engine.layout(nodes, edges)))
        .unwrap_or_else(|payload| Err(LayoutError::Panicked(panic_message(payload.as_ref()))))
        .and_then(|placements| check_complete(nodes, placements));

    match result {
        Ok(placements) => LayoutOutcome {
            placements,
            error: None,
        },
        Err(error) => {
            jview_core::warn!(engine = engine.name(), %error, "layout failed, using degenerate positions");
            LayoutOutcome {
                placements: degenerate(nodes),
                error: Some(error),
            }
        }
    }
}

/// Lay out a [`JsonGraph`] and write the positions into its nodes.
pub fn apply_layout<E>(engine: &E, graph: &mut JsonGraph) -> LayoutOutcome
where
    E: LayoutEngine + ?Sized,
{
    let nodes: Vec<LayoutNodeSpec> = graph
        .nodes
        .iter()
        .map(|node| LayoutNodeSpec {
            id: node.id.clone(),
            width: node.estimated_width,
            height: node.estimated_height,
        })
        .collect();
    let edges: Vec<LayoutEdgeSpec> = graph
        .edges
        .iter()
        .map(|edge| LayoutEdgeSpec {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
        })
        .collect();

    let outcome = layout_or_degenerate(engine, &nodes, &edges);
    // Placements come back in input order, which is graph node order.
    for (node, placement) in graph.nodes.iter_mut().zip(&outcome.placements) {
        node.position = Some(NodePosition {
            x: placement.x,
            y: placement.y,
        });
    }
    outcome
}

/// Reorder `placements` to match `nodes`, rejecting gaps and non-finite values.
fn check_complete(
    nodes: &[LayoutNodeSpec],
    placements: Vec<NodePlacement>,
) -> Result<Vec<NodePlacement>, LayoutError> {
    let mut by_id: HashMap<String, NodePlacement> = placements
        .into_iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .map(|p| (p.id.clone(), p))
        .collect();
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes
        .iter()
        .map(|node| {
            if !seen.insert(node.id.as_str()) {
                return Err(LayoutError::DuplicateNode(node.id.clone()));
            }
            by_id
                .remove(&node.id)
                .ok_or_else(|| LayoutError::MissingPlacement(node.id.clone()))
        })
        .collect()
}

fn degenerate(nodes: &[LayoutNodeSpec]) -> Vec<NodePlacement> {
    nodes
        .iter()
        .map(|node| NodePlacement {
            id: node.id.clone(),
            x: 0.0,
            y: 0.0,
        })
        .collect()
}
