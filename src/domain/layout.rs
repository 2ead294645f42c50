//! Layered layout: ranks, back-edges, columns, sizing, geometry and routes.
//!
//! Phases:
//!   1. Rank assignment (multi-source BFS from entry points, frozen once set)
//!   2. Fallback ranks for unreached nodes (SCC condensation in name order)
//!   3. Back-edge detection from rank and settle order
//!   4. Column ordering within lane buckets (barycenter sweeps)
//!   5. Row packing, sizing and coordinates
//!   6. Edge routing and line-jump hints
//!
//! Every ordering decision is keyed on node ids, so identical graphs always
//! produce identical layouts.

use crate::domain::config::{EdgeStyle, LayoutMode, LayoutOptions, RankOrigin, SizeMode};
use crate::domain::error::LayoutError;
use crate::domain::graph::CallGraph;
use crate::domain::node::{LaneId, NodeKind};
use crate::domain::routing::{EdgeRoute, Rect, route_edges};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::debug;

pub const LANE_X: i32 = 20;
pub const LANE_TOP: i32 = 20;
pub const LANE_GAP: i32 = 30;
pub const LANE_TITLE: i32 = 28;
pub const LANE_PADDING: i32 = 20;
pub const MIN_LANE_WIDTH: i32 = 980;
pub const GAP_X: i32 = 46;
pub const GAP_Y: i32 = 26;

const NODE_SIZE: (i32, i32) = (200, 64);
const RESOURCE_SIZE: (i32, i32) = (220, 80);
const DEGREE_CAP: usize = 12;
const CAPPED_DEFAULT_COLUMNS: usize = 3;

/// Position and size of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePlacement {
    pub rank: usize,
    /// Order inside the node's (lane, rank) bucket.
    pub column: usize,
    /// Visual row inside the lane; wrapping can give one rank several rows.
    pub row: usize,
    /// Position inside the visual row.
    pub slot: usize,
    /// `1.0..=2.0`, grows with call degree.
    pub weight: f64,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneBox {
    pub lane: LaneId,
    pub rect: Rect,
    pub rows: usize,
}

/// Layout of one graph. Vectors are indexed by node or edge index.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub placements: Vec<NodePlacement>,
    pub lanes: Vec<LaneBox>,
    pub routes: Vec<Option<EdgeRoute>>,
    pub back_edges: BTreeSet<EdgeIndex>,
    pub entries: Vec<NodeIndex>,
    pub edge_style: EdgeStyle,
    pub line_jumps: bool,
    pub size_mode: SizeMode,
    pub width: i32,
    pub height: i32,
}

impl Layout {
    pub fn placement(&self, idx: NodeIndex) -> Option<&NodePlacement> {
        self.placements.get(idx.index())
    }

    pub fn route(&self, edge: EdgeIndex) -> Option<&EdgeRoute> {
        self.routes.get(edge.index()).and_then(Option::as_ref)
    }

    pub fn is_back_edge(&self, edge: EdgeIndex) -> bool {
        self.back_edges.contains(&edge)
    }

    pub fn is_entry(&self, idx: NodeIndex) -> bool {
        self.entries.contains(&idx)
    }

    /// Nodes of `lane` in visual order (row, then slot).
    pub fn lane_order(&self, graph: &CallGraph, lane: LaneId) -> Vec<NodeIndex> {
        let Some(lane) = graph.lane(lane) else {
            return Vec::new();
        };
        let mut nodes = lane.nodes.clone();
        nodes.sort_by_key(|n| {
            self.placement(*n)
                .map(|p| (p.row, p.slot))
                .unwrap_or((usize::MAX, usize::MAX))
        });
        nodes
    }
}

/// Layout engine - Domain Service turning a CallGraph into a Layout
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    options: LayoutOptions,
}

impl LayoutEngine {
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn compute(&self, graph: &CallGraph) -> Result<Layout, LayoutError> {
        check_lane_totality(graph)?;

        let ctx = RankGraph::new(graph);
        let entries = self.entry_points(graph, &ctx);
        let (ranks, settle) = assign_ranks(graph, &ctx, &entries);
        let components = call_components(graph, &ctx);
        let back_edges = detect_back_edges(graph, &ranks, &settle, &components);
        debug!(
            entries = entries.len(),
            back_edges = back_edges.len(),
            "ranks assigned"
        );

        let n = graph.node_count();
        let mut column = vec![0usize; n];
        let mut lane_rows: Vec<Vec<Vec<NodeIndex>>> = Vec::with_capacity(graph.lanes.len());
        for lane in &graph.lanes {
            let mut buckets = rank_buckets(graph, &lane.nodes, &ranks);
            minimize_crossings(&mut buckets, graph, self.options.crossing_passes);
            for bucket in &buckets {
                for (pos, idx) in bucket.iter().enumerate() {
                    column[idx.index()] = pos;
                }
            }
            lane_rows.push(self.pack_rows(&buckets));
        }

        let sizes: Vec<(f64, (i32, i32))> = graph
            .graph
            .node_indices()
            .map(|idx| {
                let weight = visual_weight(graph.call_degree(idx));
                let base = if graph.node(idx).kind == NodeKind::DataResource {
                    RESOURCE_SIZE
                } else {
                    NODE_SIZE
                };
                (weight, scaled_size(base, weight, self.options.size_mode))
            })
            .collect();

        let (rects, row_slot, lanes, width, height) = place(&lane_rows, &sizes, n);

        let placements = graph
            .graph
            .node_indices()
            .map(|idx| {
                let i = idx.index();
                NodePlacement {
                    rank: ranks[i],
                    column: column[i],
                    row: row_slot[i].0,
                    slot: row_slot[i].1,
                    weight: sizes[i].0,
                    rect: rects[i],
                }
            })
            .collect();

        let routes = route_edges(graph, &rects, self.options.edge_style, self.options.line_jumps);

        Ok(Layout {
            placements,
            lanes,
            routes,
            back_edges,
            entries,
            edge_style: self.options.edge_style,
            line_jumps: self.options.line_jumps,
            size_mode: self.options.size_mode,
            width,
            height,
        })
    }

    /// Entry points sorted by id.
    fn entry_points(&self, graph: &CallGraph, ctx: &RankGraph) -> Vec<NodeIndex> {
        let mut entries: Vec<NodeIndex> = graph
            .graph
            .node_indices()
            .filter(|&idx| {
                let node = graph.node(idx);
                if node.is_entry_hint {
                    return true;
                }
                match self.options.rank_origin {
                    RankOrigin::InDegreeZero => !ctx.preds[idx.index()]
                        .iter()
                        .any(|&p| p != idx && graph.lane_of(p) == node.lane),
                    RankOrigin::ExplicitEntries => self.options.entry_points.contains(&node.id),
                }
            })
            .collect();
        entries.sort_by(|a, b| graph.node(*a).id.cmp(&graph.node(*b).id));
        entries
    }

    fn pack_rows(&self, buckets: &[Vec<NodeIndex>]) -> Vec<Vec<NodeIndex>> {
        let bound = self.options.max_columns_per_lane;
        match self.options.mode {
            LayoutMode::Layered => {
                let mut rows = Vec::new();
                for bucket in buckets {
                    if bound == 0 {
                        rows.push(bucket.clone());
                    } else {
                        rows.extend(bucket.chunks(bound).map(<[NodeIndex]>::to_vec));
                    }
                }
                rows
            }
            LayoutMode::ColumnCapped => {
                let bound = if bound == 0 { CAPPED_DEFAULT_COLUMNS } else { bound };
                let flat: Vec<NodeIndex> = buckets.iter().flatten().copied().collect();
                flat.chunks(bound).map(<[NodeIndex]>::to_vec).collect()
            }
        }
    }
}

fn check_lane_totality(graph: &CallGraph) -> Result<(), LayoutError> {
    let mut membership = vec![0usize; graph.node_count()];
    for lane in &graph.lanes {
        for idx in &lane.nodes {
            if let Some(count) = membership.get_mut(idx.index()) {
                *count += 1;
            }
        }
    }
    for idx in graph.graph.node_indices() {
        match membership[idx.index()] {
            0 => return Err(LayoutError::NodeWithoutLane(graph.node(idx).id.clone())),
            1 => {}
            _ => return Err(LayoutError::NodeInSeveralLanes(graph.node(idx).id.clone())),
        }
    }
    Ok(())
}

/// Call-kind adjacency with neighbours sorted by id.
struct RankGraph {
    succs: Vec<Vec<NodeIndex>>,
    preds: Vec<Vec<NodeIndex>>,
}

impl RankGraph {
    fn new(graph: &CallGraph) -> Self {
        let n = graph.node_count();
        let mut succs = vec![Vec::new(); n];
        let mut preds = vec![Vec::new(); n];
        for e in graph.graph.edge_references() {
            if !e.weight().kind.is_call() {
                continue;
            }
            succs[e.source().index()].push(e.target());
            preds[e.target().index()].push(e.source());
        }
        let by_id = |a: &NodeIndex, b: &NodeIndex| graph.node(*a).id.cmp(&graph.node(*b).id);
        for list in succs.iter_mut().chain(preds.iter_mut()) {
            list.sort_by(by_id);
            list.dedup();
        }
        Self { succs, preds }
    }
}

/// Returns (rank, settle order) per node index.
fn assign_ranks(
    graph: &CallGraph,
    ctx: &RankGraph,
    entries: &[NodeIndex],
) -> (Vec<usize>, Vec<usize>) {
    let n = graph.node_count();
    let mut rank: Vec<Option<usize>> = vec![None; n];
    let mut settle = vec![usize::MAX; n];
    let mut next_settle = 0usize;

    let mut queue = VecDeque::new();
    for &entry in entries {
        if rank[entry.index()].is_none() {
            rank[entry.index()] = Some(0);
            settle[entry.index()] = next_settle;
            next_settle += 1;
            queue.push_back(entry);
        }
    }

    while let Some(u) = queue.pop_front() {
        let Some(r) = rank[u.index()] else {
            continue;
        };
        for &v in &ctx.succs[u.index()] {
            if rank[v.index()].is_none() {
                rank[v.index()] = Some(r + 1);
                settle[v.index()] = next_settle;
                next_settle += 1;
                queue.push_back(v);
            }
        }
    }

    rank_unreached(graph, ctx, &mut rank, &mut settle, &mut next_settle);

    let ranks = rank.into_iter().map(|r| r.unwrap_or(0)).collect();
    (ranks, settle)
}

/// Ranks nodes no entry reaches. Strongly connected groups are processed in
/// topological order of their condensation, smallest member id first; each
/// group takes one more than the lowest rank of its same-lane ranked
/// predecessors, or 0, and its members settle in id order.
fn rank_unreached(
    graph: &CallGraph,
    ctx: &RankGraph,
    rank: &mut [Option<usize>],
    settle: &mut [usize],
    next_settle: &mut usize,
) {
    let mut pending: Vec<NodeIndex> = graph
        .graph
        .node_indices()
        .filter(|idx| rank[idx.index()].is_none())
        .collect();
    if pending.is_empty() {
        return;
    }
    pending.sort_by(|a, b| graph.node(*a).id.cmp(&graph.node(*b).id));

    let mut sub: DiGraph<NodeIndex, ()> = DiGraph::new();
    let mut local = HashMap::new();
    for &idx in &pending {
        local.insert(idx, sub.add_node(idx));
    }
    for &u in &pending {
        for v in &ctx.succs[u.index()] {
            if let (Some(&lu), Some(&lv)) = (local.get(&u), local.get(v)) {
                sub.add_edge(lu, lv, ());
            }
        }
    }

    let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&sub)
        .into_iter()
        .map(|members| {
            let mut members: Vec<NodeIndex> = members.into_iter().map(|m| sub[m]).collect();
            members.sort_by(|a, b| graph.node(*a).id.cmp(&graph.node(*b).id));
            members
        })
        .collect();
    components.sort_by(|a, b| graph.node(a[0]).id.cmp(&graph.node(b[0]).id));

    let mut component_of = HashMap::new();
    for (c, members) in components.iter().enumerate() {
        for &m in members {
            component_of.insert(m, c);
        }
    }

    let mut indegree = vec![0usize; components.len()];
    let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
    for (c, members) in components.iter().enumerate() {
        for &m in members {
            for v in &ctx.succs[m.index()] {
                if let Some(&cv) = component_of.get(v)
                    && cv != c
                    && successors[c].insert(cv)
                {
                    indegree[cv] += 1;
                }
            }
        }
    }

    // Components are sorted by smallest member id, so the index is the key.
    let mut ready: BTreeSet<usize> = (0..components.len()).filter(|&c| indegree[c] == 0).collect();
    while let Some(c) = ready.pop_first() {
        let members = &components[c];
        let mut group_rank: Option<usize> = None;
        for &m in members {
            for &p in &ctx.preds[m.index()] {
                if graph.lane_of(p) != graph.lane_of(m) {
                    continue;
                }
                if let Some(r) = rank[p.index()] {
                    group_rank = Some(group_rank.map_or(r + 1, |g| g.min(r + 1)));
                }
            }
        }
        let group_rank = group_rank.unwrap_or(0);
        for &m in members {
            rank[m.index()] = Some(group_rank);
            settle[m.index()] = *next_settle;
            *next_settle += 1;
        }
        for &cv in &successors[c] {
            indegree[cv] -= 1;
            if indegree[cv] == 0 {
                ready.insert(cv);
            }
        }
    }
}

/// Strongly connected component id per node over call edges.
fn call_components(graph: &CallGraph, ctx: &RankGraph) -> Vec<usize> {
    let n = graph.node_count();
    let mut calls: DiGraph<(), ()> = DiGraph::with_capacity(n, 0);
    for _ in 0..n {
        calls.add_node(());
    }
    for (u, succs) in ctx.succs.iter().enumerate() {
        for v in succs {
            calls.add_edge(NodeIndex::new(u), *v, ());
        }
    }
    let mut component = vec![0usize; n];
    for (c, members) in tarjan_scc(&calls).into_iter().enumerate() {
        for m in members {
            component[m.index()] = c;
        }
    }
    component
}

/// A call edge is a back-edge when its target ranks lower, or ranks equal,
/// lies on a cycle with its source and settled no later.
fn detect_back_edges(
    graph: &CallGraph,
    ranks: &[usize],
    settle: &[usize],
    components: &[usize],
) -> BTreeSet<EdgeIndex> {
    graph
        .graph
        .edge_references()
        .filter(|e| e.weight().kind.is_call())
        .filter(|e| {
            let (u, v) = (e.source().index(), e.target().index());
            ranks[v] < ranks[u]
                || (ranks[v] == ranks[u]
                    && components[v] == components[u]
                    && settle[v] <= settle[u])
        })
        .map(|e| e.id())
        .collect()
}

/// Buckets of one lane in ascending rank order, each sorted by id.
fn rank_buckets(graph: &CallGraph, nodes: &[NodeIndex], ranks: &[usize]) -> Vec<Vec<NodeIndex>> {
    let mut buckets: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
    for &idx in nodes {
        buckets.entry(ranks[idx.index()]).or_default().push(idx);
    }
    buckets
        .into_values()
        .map(|mut bucket| {
            bucket.sort_by(|a, b| graph.node(*a).id.cmp(&graph.node(*b).id));
            bucket
        })
        .collect()
}

/// Same-lane neighbours of `idx` in either direction, any edge kind.
fn lane_neighbors(graph: &CallGraph, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
    let lane = graph.lane_of(idx);
    graph
        .graph
        .neighbors_undirected(idx)
        .filter(move |&n| n != idx && graph.lane_of(n) == lane)
}

fn positions(order: &[NodeIndex]) -> HashMap<NodeIndex, usize> {
    order.iter().enumerate().map(|(pos, &idx)| (idx, pos)).collect()
}

fn barycenter(graph: &CallGraph, idx: NodeIndex, reference: &HashMap<NodeIndex, usize>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for n in lane_neighbors(graph, idx) {
        if let Some(&pos) = reference.get(&n) {
            sum += pos as f64;
            count += 1;
        }
    }
    if count == 0 {
        f64::MAX
    } else {
        sum / count as f64
    }
}

fn reorder(graph: &CallGraph, bucket: &mut [NodeIndex], reference: &[NodeIndex]) {
    let reference = positions(reference);
    let mut scored: Vec<(f64, NodeIndex)> = bucket
        .iter()
        .map(|&idx| (barycenter(graph, idx, &reference), idx))
        .collect();
    scored.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| graph.node(a.1).id.cmp(&graph.node(b.1).id))
    });
    for (slot, (_, idx)) in bucket.iter_mut().zip(scored) {
        *slot = idx;
    }
}

fn count_crossings(graph: &CallGraph, upper: &[NodeIndex], lower: &[NodeIndex]) -> usize {
    let up = positions(upper);
    let low = positions(lower);
    let mut pairs = Vec::new();
    for e in graph.graph.edge_references() {
        let (s, t) = (e.source(), e.target());
        if let (Some(&a), Some(&b)) = (up.get(&s), low.get(&t)) {
            pairs.push((a, b));
        } else if let (Some(&a), Some(&b)) = (up.get(&t), low.get(&s)) {
            pairs.push((a, b));
        }
    }
    let mut crossings = 0;
    for i in 0..pairs.len() {
        for j in i + 1..pairs.len() {
            let (a1, b1) = pairs[i];
            let (a2, b2) = pairs[j];
            if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                crossings += 1;
            }
        }
    }
    crossings
}

fn total_crossings(graph: &CallGraph, buckets: &[Vec<NodeIndex>]) -> usize {
    buckets
        .windows(2)
        .map(|w| count_crossings(graph, &w[0], &w[1]))
        .sum()
}

/// Iterated barycenter sweeps, keeping the best order seen. Stops after
/// `passes` rounds or at the first round that does not improve.
fn minimize_crossings(buckets: &mut Vec<Vec<NodeIndex>>, graph: &CallGraph, passes: usize) {
    if buckets.len() <= 1 {
        return;
    }
    let mut best = total_crossings(graph, buckets);
    let mut best_order = buckets.clone();

    for _ in 0..passes {
        if best == 0 {
            break;
        }
        for r in 1..buckets.len() {
            let (before, after) = buckets.split_at_mut(r);
            reorder(graph, &mut after[0], &before[r - 1]);
        }
        for r in (0..buckets.len() - 1).rev() {
            let (before, after) = buckets.split_at_mut(r + 1);
            reorder(graph, &mut before[r], &after[0]);
        }
        let crossings = total_crossings(graph, buckets);
        if crossings < best {
            best = crossings;
            best_order = buckets.clone();
        } else {
            break;
        }
    }
    *buckets = best_order;
}

pub fn visual_weight(call_degree: usize) -> f64 {
    1.0 + call_degree.min(DEGREE_CAP) as f64 / DEGREE_CAP as f64
}

fn scaled_size(base: (i32, i32), weight: f64, mode: SizeMode) -> (i32, i32) {
    match mode {
        SizeMode::Uniform => base,
        SizeMode::DegreeBased => {
            let grow = weight - 1.0;
            (
                base.0 + (grow * 60.0).round() as i32,
                base.1 + (grow * 24.0).round() as i32,
            )
        }
    }
}

type Placed = (Vec<Rect>, Vec<(usize, usize)>, Vec<LaneBox>, i32, i32);

/// Stacks lanes vertically and rows inside each lane; every lane gets the
/// width of the widest one.
fn place(lane_rows: &[Vec<Vec<NodeIndex>>], sizes: &[(f64, (i32, i32))], n: usize) -> Placed {
    let mut rects = vec![Rect::default(); n];
    let mut row_slot = vec![(0usize, 0usize); n];

    let row_width = |row: &Vec<NodeIndex>| -> i32 {
        let widths: i32 = row.iter().map(|idx| sizes[idx.index()].1.0).sum();
        widths + GAP_X * (row.len().saturating_sub(1)) as i32
    };
    let lane_width = lane_rows
        .iter()
        .flatten()
        .map(|row| row_width(row) + 2 * LANE_PADDING)
        .max()
        .unwrap_or(0)
        .max(MIN_LANE_WIDTH);

    let mut lanes = Vec::with_capacity(lane_rows.len());
    let mut y = LANE_TOP;
    for (lane, rows) in lane_rows.iter().enumerate() {
        let top = y;
        let mut cursor = top + LANE_TITLE + LANE_PADDING;
        for (r, row) in rows.iter().enumerate() {
            let row_height = row.iter().map(|idx| sizes[idx.index()].1.1).max().unwrap_or(0);
            let mut x = LANE_X + LANE_PADDING;
            for (slot, idx) in row.iter().enumerate() {
                let (w, h) = sizes[idx.index()].1;
                rects[idx.index()] = Rect::new(x, cursor + (row_height - h) / 2, w, h);
                row_slot[idx.index()] = (r, slot);
                x += w + GAP_X;
            }
            cursor += row_height;
            if r + 1 < rows.len() {
                cursor += GAP_Y;
            }
        }
        let height = (cursor + LANE_PADDING - top).max(LANE_TITLE + 2 * LANE_PADDING);
        lanes.push(LaneBox {
            lane,
            rect: Rect::new(LANE_X, top, lane_width, height),
            rows: rows.len(),
        });
        y = top + height + LANE_GAP;
    }

    let width = LANE_X * 2 + lane_width;
    let height = (y - LANE_GAP + LANE_TOP).max(LANE_TOP * 2);
    (rects, row_slot, lanes, width, height)
}
