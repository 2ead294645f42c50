use crate::domain::edge::{Edge, EdgeKind};
use crate::domain::node::{LaneId, Node};
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};

/// Node identifier (qualified name, verbatim external name or resource name)
pub type SymbolId = String;

/// Lane kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneKind {
    Module,
    Resources,
}

/// Named lane; `nodes` keeps insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub name: String,
    pub kind: LaneKind,
    pub nodes: Vec<NodeIndex>,
}

/// Reserved name of the data-resource lane.
pub const RESOURCE_LANE: &str = "DATASOURCES";

/// Symbol-table key of an external node. Prefixed so that a library name can
/// never alias an extracted entity.
pub fn external_key(name: &str) -> String {
    format!("ext:{name}")
}

/// Symbol-table key of a data-resource node.
pub fn resource_key(name: &str) -> String {
    format!("db:{name}")
}

/// Call graph - the core data structure
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    /// The directed graph of nodes and edges
    pub graph: DiGraph<Node, Edge>,

    /// Mapping from symbol to node index
    pub symbol_to_node: HashMap<SymbolId, NodeIndex>,

    /// Module lanes in first-seen order, then at most one resource lane
    pub lanes: Vec<Lane>,

    edge_keys: HashSet<(NodeIndex, NodeIndex, EdgeKind, Option<String>)>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lane(&mut self, name: impl Into<String>, kind: LaneKind) -> LaneId {
        self.lanes.push(Lane {
            name: name.into(),
            kind,
            nodes: Vec::new(),
        });
        self.lanes.len() - 1
    }

    pub fn lane_by_name(&self, name: &str) -> Option<LaneId> {
        self.lanes.iter().position(|lane| lane.name == name)
    }

    /// Adds `node` and registers it with its lane. The caller guarantees the
    /// lane exists and the symbol is new.
    pub fn add_node(&mut self, symbol: SymbolId, node: Node) -> NodeIndex {
        let lane = node.lane;
        let idx = self.graph.add_node(node);
        self.symbol_to_node.insert(symbol, idx);
        if let Some(lane) = self.lanes.get_mut(lane) {
            lane.nodes.push(idx);
        }
        idx
    }

    /// Adds an edge unless an identical `(source, target, kind, label)` edge
    /// already exists. Returns the index of the new edge.
    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, edge: Edge) -> Option<EdgeIndex> {
        let key = (source, target, edge.kind, edge.label.clone());
        if !self.edge_keys.insert(key) {
            return None;
        }
        Some(self.graph.add_edge(source, target, edge))
    }

    pub fn get_node_by_symbol(&self, symbol: &str) -> Option<NodeIndex> {
        self.symbol_to_node.get(symbol).copied()
    }

    /// Looks a node up by its displayed id, trying entities, then external
    /// symbols, then data resources.
    pub fn find_node(&self, id: &str) -> Option<NodeIndex> {
        self.get_node_by_symbol(id)
            .or_else(|| self.get_node_by_symbol(&external_key(id)))
            .or_else(|| self.get_node_by_symbol(&resource_key(id)))
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut Node {
        &mut self.graph[idx]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing edges in insertion order.
    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, &Edge)> {
        let mut out: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target(), e.weight()))
            .collect();
        out.sort_by_key(|(id, _, _)| *id);
        out.into_iter().map(|(_, target, edge)| (target, edge))
    }

    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }

    /// In + out degree across call kinds only.
    pub fn call_degree(&self, idx: NodeIndex) -> usize {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .chain(self.graph.edges_directed(idx, Direction::Outgoing))
            .filter(|e| e.weight().kind.is_call())
            .count()
    }

    pub fn lane_of(&self, idx: NodeIndex) -> LaneId {
        self.graph[idx].lane
    }

    pub fn lane(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.get(id)
    }

    pub fn resource_lane(&self) -> Option<LaneId> {
        self.lanes.iter().position(|lane| lane.kind == LaneKind::Resources)
    }
}
