use crate::domain::edge::{Edge, EdgeKind};
use crate::domain::entity::Entity;
use crate::domain::error::{GraphError, UnresolvedReference};
use crate::domain::graph::{CallGraph, LaneKind, RESOURCE_LANE, external_key, resource_key};
use crate::domain::node::{LaneId, Node};
use crate::domain::reference::{ReferenceKind, ReferenceRecord};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Result of one assembly: the graph plus the references that had to be
/// downgraded to call-external.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub graph: CallGraph,
    pub unresolved: Vec<UnresolvedReference>,
}

/// Graph assembler - Domain Service for constructing CallGraph
#[derive(Debug, Default)]
pub struct GraphAssembler;

impl GraphAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Two-pass build: nodes first, then edges
    pub fn assemble(
        &self,
        entities: &[Entity],
        references: &[ReferenceRecord],
    ) -> Result<Assembly, GraphError> {
        let mut graph = CallGraph::new();
        let mut unresolved = Vec::new();

        // Pass 1: Lanes and entity nodes, in extraction order
        let mut module_lanes = HashMap::new();
        for entity in entities {
            if graph.get_node_by_symbol(&entity.qualified_name).is_some() {
                return Err(GraphError::DuplicateEntity(entity.qualified_name.clone()));
            }
            let lane = *module_lanes
                .entry(entity.module.clone())
                .or_insert_with(|| graph.add_lane(entity.module.clone(), LaneKind::Module));

            let mut node = Node::internal(
                entity.qualified_name.clone(),
                entity.module.clone(),
                entity.display_label(),
                lane,
            );
            node.param_count = entity.param_count;
            node.is_entry_hint = entity.is_entry_hint();
            graph.add_node(entity.qualified_name.clone(), node);
        }

        // Pass 2: Edge wiring, synthesizing external and resource nodes
        let mut resource_lane = None;
        for reference in references {
            let source_idx = graph.get_node_by_symbol(&reference.source).ok_or_else(|| {
                GraphError::UnknownSource {
                    source_name: reference.source.clone(),
                    target: reference.target.clone(),
                }
            })?;
            let source_lane = graph.lane_of(source_idx);

            let (target_idx, kind) = match reference.kind {
                ReferenceKind::CallInternal => match graph.get_node_by_symbol(&reference.target) {
                    Some(idx) => (idx, EdgeKind::CallInternal),
                    _ => {
                        warn!(
                            source = %reference.source,
                            symbol = %reference.symbol,
                            "internal target not extracted; keeping as external call"
                        );
                        unresolved.push(UnresolvedReference {
                            source: reference.source.clone(),
                            symbol: reference.symbol.clone(),
                            reason: format!("no extracted entity named `{}`", reference.target),
                        });
                        let idx = external_node(&mut graph, &reference.symbol, source_lane);
                        (idx, EdgeKind::CallExternal)
                    }
                },
                ReferenceKind::CallExternal => {
                    let idx = external_node(&mut graph, &reference.target, source_lane);
                    (idx, EdgeKind::CallExternal)
                }
                ReferenceKind::DataAccess => {
                    let lane = *resource_lane
                        .get_or_insert_with(|| graph.add_lane(RESOURCE_LANE, LaneKind::Resources));
                    let idx = match graph.get_node_by_symbol(&resource_key(&reference.target)) {
                        Some(idx) => idx,
                        None => graph.add_node(
                            resource_key(&reference.target),
                            Node::resource(reference.target.clone(), lane),
                        ),
                    };
                    graph.node_mut(source_idx).touches_data = true;
                    (idx, EdgeKind::DataAccess)
                }
            };

            // Identical (source, target, kind, label) tuples collapse into one edge
            if graph
                .add_edge(source_idx, target_idx, Edge::new(kind, reference.label.clone()))
                .is_none()
            {
                debug!(source = %reference.source, target = %reference.target, "duplicate edge collapsed");
            }
        }

        Ok(Assembly { graph, unresolved })
    }
}

/// Get-or-create the external node for a verbatim name. The node lives in the
/// lane of the first module that references it.
fn external_node(graph: &mut CallGraph, name: &str, lane: LaneId) -> NodeIndex {
    let key = external_key(name);
    match graph.get_node_by_symbol(&key) {
        Some(idx) => idx,
        None => graph.add_node(key, Node::external(name, lane)),
    }
}
