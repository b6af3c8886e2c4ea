#![forbid(unsafe_code)]

//! Layered (Sugiyama-style) layout.
//!
//! 1. **Ranking**: longest path from the sources (Kahn's algorithm). Nodes
//!    left over by a cycle share one rank after the last.
//! 2. **Ordering**: alternating forward/backward barycenter sweeps. Each
//!    iteration is scored with a Fenwick-tree crossing count; the loop stops
//!    on the first iteration that does not improve and keeps the best order.
//! 3. **Coordinates**: ranks advance along the main axis by the widest node
//!    of the previous rank plus `rank_gap`; nodes in a rank stack along the
//!    cross axis with `node_gap` between them, and each rank is centred on
//!    the widest one.
//!
//! All tie-breaks use input order, so equal input gives equal output.

use std::collections::HashMap;

use crate::{LayoutEdgeSpec, LayoutEngine, LayoutError, LayoutNodeSpec, NodePlacement};

/// Default cap on barycenter iterations.
pub const DEFAULT_ITERATION_BUDGET: usize = 24;

/// Direction in which ranks advance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayoutDirection {
    /// Ranks advance along x (left to right).
    #[default]
    Right,
    /// Ranks advance along y (top to bottom).
    Down,
}

impl LayoutDirection {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "right" | "lr" => Some(Self::Right),
            "down" | "tb" | "td" => Some(Self::Down),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::Down => "down",
        }
    }
}

/// Gaps between layers and between siblings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSpacing {
    /// Space between adjacent ranks.
    pub rank_gap: f64,
    /// Space between neighbours within a rank.
    pub node_gap: f64,
}

impl Default for LayoutSpacing {
    fn default() -> Self {
        Self {
            rank_gap: 100.0,
            node_gap: 80.0,
        }
    }
}

/// Deterministic layered layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayeredLayout {
    direction: LayoutDirection,
    spacing: LayoutSpacing,
    max_iterations: usize,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::default(),
            spacing: LayoutSpacing::default(),
            max_iterations: DEFAULT_ITERATION_BUDGET,
        }
    }
}

impl LayeredLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_direction(mut self, direction: LayoutDirection) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_spacing(mut self, spacing: LayoutSpacing) -> Self {
        self.spacing = spacing;
        self
    }

    #[must_use]
    pub fn with_iteration_budget(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub const fn direction(&self) -> LayoutDirection {
        self.direction
    }

    #[must_use]
    pub const fn spacing(&self) -> LayoutSpacing {
        self.spacing
    }
}

impl LayoutEngine for LayeredLayout {
    fn layout(
        &self,
        nodes: &[LayoutNodeSpec],
        edges: &[LayoutEdgeSpec],
    ) -> Result<Vec<NodePlacement>, LayoutError> {
        let _span = jview_core::debug_span!(
            "layered_layout",
            nodes = nodes.len(),
            edges = edges.len()
        )
        .entered();

        let graph = LayoutGraph::build(nodes, edges)?;
        let ranks = assign_ranks(&graph);
        let mut rank_order = build_rank_buckets(&ranks);
        let (iterations, crossings) =
            minimize_crossings(&mut rank_order, &graph, self.max_iterations);
        jview_core::debug!(
            ranks = rank_order.len(),
            iterations,
            crossings,
            "layered layout ordered"
        );

        let sizes: Vec<(f64, f64)> = nodes.iter().map(|n| (n.width, n.height)).collect();
        let coords = assign_coordinates(&rank_order, &sizes, self.direction, &self.spacing);
        Ok(nodes
            .iter()
            .zip(coords)
            .map(|(node, (x, y))| NodePlacement {
                id: node.id.clone(),
                x,
                y,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "layered"
    }
}

// ── Internal graph representation ────────────────────────────────────

/// Adjacency lists over node indices (input order).
struct LayoutGraph {
    n: usize,
    /// adj[u] = sorted successors of u.
    adj: Vec<Vec<usize>>,
    /// rev[v] = sorted predecessors of v.
    rev: Vec<Vec<usize>>,
}

impl LayoutGraph {
    fn build(nodes: &[LayoutNodeSpec], edges: &[LayoutEdgeSpec]) -> Result<Self, LayoutError> {
        let n = nodes.len();
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(n);
        for (i, node) in nodes.iter().enumerate() {
            let valid = |v: f64| v.is_finite() && v >= 0.0;
            if !valid(node.width) || !valid(node.height) {
                return Err(LayoutError::InvalidSize {
                    node: node.id.clone(),
                    width: node.width,
                    height: node.height,
                });
            }
            if index.insert(node.id.as_str(), i).is_some() {
                return Err(LayoutError::DuplicateNode(node.id.clone()));
            }
        }

        let mut adj = vec![Vec::new(); n];
        let mut rev = vec![Vec::new(); n];
        for edge in edges {
            let lookup = |id: &str| {
                index
                    .get(id)
                    .copied()
                    .ok_or_else(|| LayoutError::UnknownEndpoint {
                        edge: edge.id.clone(),
                        node: id.to_string(),
                    })
            };
            let u = lookup(&edge.source)?;
            let v = lookup(&edge.target)?;
            if u != v {
                adj[u].push(v);
                rev[v].push(u);
            }
        }
        for list in adj.iter_mut().chain(rev.iter_mut()) {
            list.sort_unstable();
            list.dedup();
        }

        Ok(Self { n, adj, rev })
    }
}

// ── Phase 1: Rank assignment ─────────────────────────────────────────

/// Longest-path ranks: sources get 0, every other node 1 + max over its
/// predecessors.
fn assign_ranks(graph: &LayoutGraph) -> Vec<usize> {
    let n = graph.n;
    let mut in_degree: Vec<usize> = graph.rev.iter().map(Vec::len).collect();
    let mut queue: Vec<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    let mut ranks = vec![0usize; n];
    let mut done = vec![false; n];

    let mut head = 0;
    while head < queue.len() {
        let u = queue[head];
        head += 1;
        done[u] = true;
        for &v in &graph.adj[u] {
            ranks[v] = ranks[v].max(ranks[u] + 1);
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push(v);
            }
        }
    }

    if queue.len() < n {
        let cycle_rank = ranks
            .iter()
            .zip(&done)
            .filter(|(_, d)| **d)
            .map(|(r, _)| *r + 1)
            .max()
            .unwrap_or(0);
        for (rank, _) in ranks.iter_mut().zip(&done).filter(|(_, d)| !**d) {
            *rank = cycle_rank;
        }
    }
    ranks
}

// ── Phase 2: Ordering within ranks ───────────────────────────────────

/// rank_order[r] = node indices at rank r, in input order. Empty ranks are
/// dropped.
fn build_rank_buckets(ranks: &[usize]) -> Vec<Vec<usize>> {
    let Some(max_rank) = ranks.iter().copied().max() else {
        return Vec::new();
    };
    let mut buckets = vec![Vec::new(); max_rank + 1];
    for (v, &r) in ranks.iter().enumerate() {
        buckets[r].push(v);
    }
    buckets.retain(|bucket| !bucket.is_empty());
    buckets
}

fn positions_into(order: &[usize], n: usize, positions: &mut Vec<usize>) {
    positions.clear();
    positions.resize(n, usize::MAX);
    for (pos, &node) in order.iter().enumerate() {
        positions[node] = pos;
    }
}

/// Mean position of `neighbors` in the adjacent rank; `f64::MAX` if none
/// of them is there.
fn barycenter(adjacent_pos: &[usize], neighbors: &[usize]) -> f64 {
    let (sum, count) = neighbors
        .iter()
        .map(|&nb| adjacent_pos[nb])
        .filter(|&pos| pos != usize::MAX)
        .fold((0.0, 0usize), |(sum, count), pos| (sum + pos as f64, count + 1));
    if count == 0 {
        f64::MAX
    } else {
        sum / count as f64
    }
}

/// Reorder rank `r` by the barycenters of its neighbours in rank `fixed`.
/// The sort is stable, so ties keep their current order.
fn sweep_rank(
    rank_order: &mut [Vec<usize>],
    graph: &LayoutGraph,
    r: usize,
    fixed: usize,
    pos_buf: &mut Vec<usize>,
) {
    positions_into(&rank_order[fixed], graph.n, pos_buf);
    let neighbours = if fixed < r { &graph.rev } else { &graph.adj };
    let mut scored: Vec<(usize, f64)> = rank_order[r]
        .iter()
        .map(|&v| (v, barycenter(pos_buf, &neighbours[v])))
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    rank_order[r] = scored.into_iter().map(|(v, _)| v).collect();
}

/// Binary indexed tree over positions in the lower rank.
struct Fenwick {
    tree: Vec<usize>,
}

impl Fenwick {
    fn new(size: usize) -> Self {
        Self {
            tree: vec![0; size + 1],
        }
    }

    fn add(&mut self, idx: usize) {
        let mut i = idx + 1;
        while i < self.tree.len() {
            self.tree[i] += 1;
            i += i & i.wrapping_neg();
        }
    }

    /// Count of entries in [0, idx).
    fn prefix(&self, idx: usize) -> usize {
        let mut acc = 0;
        let mut i = idx.min(self.tree.len() - 1);
        while i > 0 {
            acc += self.tree[i];
            i &= i - 1;
        }
        acc
    }
}

/// Edge crossings between two adjacent ranks, O(E log V).
fn count_crossings(upper: &[usize], lower: &[usize], graph: &LayoutGraph, pos_buf: &mut Vec<usize>) -> usize {
    positions_into(lower, graph.n, pos_buf);
    let mut edges: Vec<(usize, usize)> = Vec::new();
    for (i, &u) in upper.iter().enumerate() {
        for &v in &graph.adj[u] {
            if pos_buf[v] != usize::MAX {
                edges.push((i, pos_buf[v]));
            }
        }
    }
    if edges.len() < 2 {
        return 0;
    }

    // Edges sharing an upper endpoint never cross each other, so each group
    // is queried before any of it is inserted.
    let mut bit = Fenwick::new(lower.len());
    let mut crossings = 0;
    let mut seen = 0;
    let mut start = 0;
    while start < edges.len() {
        let mut end = start + 1;
        while end < edges.len() && edges[end].0 == edges[start].0 {
            end += 1;
        }
        for &(_, b) in &edges[start..end] {
            crossings += seen - bit.prefix(b + 1);
        }
        for &(_, b) in &edges[start..end] {
            bit.add(b);
            seen += 1;
        }
        start = end;
    }
    crossings
}

fn total_crossings(rank_order: &[Vec<usize>], graph: &LayoutGraph, pos_buf: &mut Vec<usize>) -> usize {
    rank_order
        .windows(2)
        .map(|pair| count_crossings(&pair[0], &pair[1], graph, pos_buf))
        .sum()
}

/// Iterated barycenter sweeps. Returns `(iterations, crossings)` of the
/// order left in `rank_order`.
fn minimize_crossings(
    rank_order: &mut Vec<Vec<usize>>,
    graph: &LayoutGraph,
    max_iterations: usize,
) -> (usize, usize) {
    let mut pos_buf = Vec::with_capacity(graph.n);
    let mut best = total_crossings(rank_order, graph, &mut pos_buf);
    if rank_order.len() <= 1 || best == 0 {
        return (0, best);
    }
    let mut best_order = rank_order.clone();
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        for r in 1..rank_order.len() {
            sweep_rank(rank_order, graph, r, r - 1, &mut pos_buf);
        }
        for r in (0..rank_order.len() - 1).rev() {
            sweep_rank(rank_order, graph, r, r + 1, &mut pos_buf);
        }

        let crossings = total_crossings(rank_order, graph, &mut pos_buf);
        if crossings < best {
            best = crossings;
            best_order.clone_from(rank_order);
            if best == 0 {
                break;
            }
        } else {
            break;
        }
    }
    *rank_order = best_order;
    (iterations, best)
}

// ── Phase 3: Coordinate assignment ───────────────────────────────────

/// `(x, y)` per node index.
fn assign_coordinates(
    rank_order: &[Vec<usize>],
    sizes: &[(f64, f64)],
    direction: LayoutDirection,
    spacing: &LayoutSpacing,
) -> Vec<(f64, f64)> {
    // (extent along the rank axis, extent along the cross axis)
    let extents = |v: usize| match direction {
        LayoutDirection::Right => sizes[v],
        LayoutDirection::Down => (sizes[v].1, sizes[v].0),
    };

    let mut main = vec![0.0; sizes.len()];
    let mut cross = vec![0.0; sizes.len()];
    let mut rank_offset = 0.0;
    let mut spans = Vec::with_capacity(rank_order.len());

    for rank in rank_order {
        let mut offset = 0.0;
        let mut depth: f64 = 0.0;
        for (i, &v) in rank.iter().enumerate() {
            let (along, across) = extents(v);
            if i > 0 {
                offset += spacing.node_gap;
            }
            main[v] = rank_offset;
            cross[v] = offset;
            offset += across;
            depth = depth.max(along);
        }
        spans.push(offset);
        rank_offset += depth + spacing.rank_gap;
    }

    let widest = spans.iter().copied().fold(0.0_f64, f64::max);
    for (rank, span) in rank_order.iter().zip(&spans) {
        let shift = (widest - span) / 2.0;
        for &v in rank {
            cross[v] += shift;
        }
    }

    main.into_iter()
        .zip(cross)
        .map(|(m, c)| match direction {
            LayoutDirection::Right => (m, c),
            LayoutDirection::Down => (c, m),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, width: f64, height: f64) -> LayoutNodeSpec {
        LayoutNodeSpec {
            id: id.to_string(),
            width,
            height,
        }
    }

    fn edge(source: &str, target: &str) -> LayoutEdgeSpec {
        LayoutEdgeSpec {
            id: format!("e-{source}-{target}"),
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    fn position<'a>(placements: &'a [NodePlacement], id: &str) -> (f64, f64) {
        let p = placements.iter().find(|p| p.id == id).unwrap();
        (p.x, p.y)
    }

    #[test]
    fn empty_graph() {
        let placements = LayeredLayout::default().layout(&[], &[]).unwrap();
        assert!(placements.is_empty());
    }

    #[test]
    fn single_node_at_origin() {
        let placements = LayeredLayout::default()
            .layout(&[node("a", 220.0, 60.0)], &[])
            .unwrap();
        assert_eq!(position(&placements, "a"), (0.0, 0.0));
    }

    #[test]
    fn chain_advances_by_width_plus_gap() {
        let nodes = [node("a", 220.0, 60.0), node("b", 220.0, 60.0), node("c", 220.0, 60.0)];
        let edges = [edge("a", "b"), edge("b", "c")];
        let placements = LayeredLayout::default().layout(&nodes, &edges).unwrap();
        assert_eq!(position(&placements, "a"), (0.0, 0.0));
        assert_eq!(position(&placements, "b"), (320.0, 0.0));
        assert_eq!(position(&placements, "c"), (640.0, 0.0));
    }

    #[test]
    fn siblings_stack_and_parent_centres() {
        let nodes = [node("r", 220.0, 60.0), node("x", 220.0, 60.0), node("y", 220.0, 60.0)];
        let edges = [edge("r", "x"), edge("r", "y")];
        let placements = LayeredLayout::default().layout(&nodes, &edges).unwrap();
        assert_eq!(position(&placements, "x"), (320.0, 0.0));
        assert_eq!(position(&placements, "y"), (320.0, 140.0));
        assert_eq!(position(&placements, "r"), (0.0, 70.0));
    }

    #[test]
    fn down_direction_swaps_axes() {
        let nodes = [node("a", 220.0, 60.0), node("b", 220.0, 90.0)];
        let layout = LayeredLayout::new().with_direction(LayoutDirection::Down);
        let placements = layout.layout(&nodes, &[edge("a", "b")]).unwrap();
        assert_eq!(position(&placements, "a"), (0.0, 0.0));
        assert_eq!(position(&placements, "b"), (0.0, 160.0));
    }

    #[test]
    fn rank_depth_uses_widest_node() {
        let nodes = [
            node("r", 100.0, 60.0),
            node("wide", 300.0, 60.0),
            node("narrow", 50.0, 60.0),
            node("leaf", 10.0, 10.0),
        ];
        let edges = [edge("r", "wide"), edge("r", "narrow"), edge("narrow", "leaf")];
        let placements = LayeredLayout::default().layout(&nodes, &edges).unwrap();
        assert_eq!(position(&placements, "leaf").0, 100.0 + 100.0 + 300.0 + 100.0);
    }

    #[test]
    fn barycenter_removes_crossing() {
        let nodes = [
            node("a", 10.0, 10.0),
            node("b", 10.0, 10.0),
            node("c", 10.0, 10.0),
            node("d", 10.0, 10.0),
        ];
        let edges = [edge("a", "d"), edge("b", "c")];
        let graph = LayoutGraph::build(&nodes, &edges).unwrap();
        let mut order = build_rank_buckets(&assign_ranks(&graph));
        let mut buf = Vec::new();
        assert_eq!(total_crossings(&order, &graph, &mut buf), 1);
        let (_, crossings) = minimize_crossings(&mut order, &graph, DEFAULT_ITERATION_BUDGET);
        assert_eq!(crossings, 0);
        assert_eq!(total_crossings(&order, &graph, &mut buf), 0);

        let placements = LayeredLayout::default().layout(&nodes, &edges).unwrap();
        assert!(position(&placements, "d").1 < position(&placements, "c").1);
    }

    #[test]
    fn fenwick_counts_inversions() {
        // 0 -> 5, 1 -> 4, 2 -> 3: every pair crosses.
        let nodes: Vec<LayoutNodeSpec> = (0..6).map(|i| node(&i.to_string(), 1.0, 1.0)).collect();
        let edges = [edge("0", "5"), edge("1", "4"), edge("2", "3")];
        let graph = LayoutGraph::build(&nodes, &edges).unwrap();
        let mut buf = Vec::new();
        assert_eq!(count_crossings(&[0, 1, 2], &[3, 4, 5], &graph, &mut buf), 3);
        assert_eq!(count_crossings(&[0, 1, 2], &[5, 4, 3], &graph, &mut buf), 0);
    }

    #[test]
    fn shared_source_edges_do_not_cross() {
        let nodes: Vec<LayoutNodeSpec> = (0..3).map(|i| node(&i.to_string(), 1.0, 1.0)).collect();
        let edges = [edge("0", "1"), edge("0", "2")];
        let graph = LayoutGraph::build(&nodes, &edges).unwrap();
        let mut buf = Vec::new();
        assert_eq!(count_crossings(&[0], &[2, 1], &graph, &mut buf), 0);
    }

    #[test]
    fn cycle_nodes_still_placed() {
        let nodes = [node("a", 10.0, 10.0), node("b", 10.0, 10.0), node("c", 10.0, 10.0)];
        let edges = [edge("a", "b"), edge("b", "c"), edge("c", "b")];
        let placements = LayeredLayout::default().layout(&nodes, &edges).unwrap();
        assert_eq!(placements.len(), 3);
        assert!(placements.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert_eq!(position(&placements, "a").0, 0.0);
        assert_eq!(position(&placements, "b").0, position(&placements, "c").0);
    }

    #[test]
    fn rejects_bad_input() {
        let layout = LayeredLayout::default();
        let err = layout
            .layout(&[node("a", 1.0, 1.0)], &[edge("a", "zz")])
            .unwrap_err();
        assert_eq!(
            err,
            LayoutError::UnknownEndpoint {
                edge: "e-a-zz".into(),
                node: "zz".into()
            }
        );
        let err = layout
            .layout(&[node("a", 1.0, 1.0), node("a", 1.0, 1.0)], &[])
            .unwrap_err();
        assert_eq!(err, LayoutError::DuplicateNode("a".into()));
        let err = layout.layout(&[node("a", f64::NAN, 1.0)], &[]).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidSize { .. }));
    }

    #[test]
    fn self_loops_and_duplicate_edges_ignored() {
        let nodes = [node("a", 10.0, 10.0), node("b", 10.0, 10.0)];
        let edges = [edge("a", "a"), edge("a", "b"), edge("a", "b")];
        let placements = LayeredLayout::default().layout(&nodes, &edges).unwrap();
        assert_eq!(position(&placements, "b").0, 110.0);
    }

    #[test]
    fn direction_parsing() {
        assert_eq!(LayoutDirection::parse("RIGHT"), Some(LayoutDirection::Right));
        assert_eq!(LayoutDirection::parse("tb"), Some(LayoutDirection::Down));
        assert_eq!(LayoutDirection::parse("up"), None);
    }
}
