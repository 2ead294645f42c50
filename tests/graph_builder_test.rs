//! GraphAssembler integration tests using fixture entities and references.

mod common;

use flowlanes::domain::builder::GraphAssembler;
use flowlanes::domain::edge::EdgeKind;
use flowlanes::domain::error::GraphError;
use flowlanes::domain::graph::{LaneKind, RESOURCE_LANE};
use flowlanes::domain::node::NodeKind;
use flowlanes::domain::reference::ReferenceRecord;
use petgraph::visit::EdgeRef;
use pretty_assertions::assert_eq;

use common::fixtures::{
    assemble, call, data_access, external, function, mixed, scenario_a,
};

fn edge_tuples(graph: &flowlanes::domain::graph::CallGraph) -> Vec<(String, String, EdgeKind)> {
    graph
        .graph
        .edge_references()
        .map(|e| {
            (
                graph.node(e.source()).id.clone(),
                graph.node(e.target()).id.clone(),
                e.weight().kind,
            )
        })
        .collect()
}

#[test]
fn test_scenario_a_internal_and_external_calls() {
    let (entities, references) = scenario_a();
    let graph = assemble(&entities, &references);

    assert_eq!(graph.node_count(), 3);
    assert_eq!(
        edge_tuples(&graph),
        vec![
            ("m.f".to_string(), "m.g".to_string(), EdgeKind::CallInternal),
            ("m.g".to_string(), "lib.x".to_string(), EdgeKind::CallExternal),
        ]
    );
    let x = graph.find_node("lib.x").unwrap();
    assert_eq!(graph.node(x).kind, NodeKind::ExternalSymbol);
    assert_eq!(graph.lane_of(x), graph.lane_of(graph.find_node("m.g").unwrap()));
}

#[test]
fn test_scenario_b_data_access_goes_to_resource_lane() {
    let entities = vec![function("m", "f")];
    let references = vec![data_access("m.f", "select", "orders")];
    let graph = assemble(&entities, &references);

    let f = graph.find_node("m.f").unwrap();
    let orders = graph.find_node("orders").unwrap();
    assert!(graph.node(f).touches_data);
    assert!(graph.node(orders).is_resource());
    assert_eq!(Some(graph.lane_of(orders)), graph.resource_lane());
    assert_eq!(graph.lane(graph.lane_of(orders)).unwrap().name, RESOURCE_LANE);

    let edges: Vec<_> = graph.neighbors(f).collect();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].0, orders);
    assert_eq!(edges[0].1.kind, EdgeKind::DataAccess);
    assert_eq!(edges[0].1.label.as_deref(), Some("SELECT"));
}

#[test]
fn test_duplicate_references_collapse() {
    let (entities, mut references) = mixed();
    let before = assemble(&entities, &references).edge_count();

    references.extend(references.clone());
    let after = assemble(&entities, &references).edge_count();
    assert_eq!(before, after);

    // A different label is a different edge
    references.push(ReferenceRecord::internal(
        "app.main",
        "load",
        "app.load",
        Some("on_click".into()),
    ));
    assert_eq!(assemble(&entities, &references).edge_count(), before + 1);
}

#[test]
fn test_every_node_in_exactly_one_lane_and_resources_last() {
    let (entities, references) = mixed();
    let graph = assemble(&entities, &references);

    for idx in graph.graph.node_indices() {
        let owners: Vec<_> = graph
            .lanes
            .iter()
            .enumerate()
            .filter(|(_, lane)| lane.nodes.contains(&idx))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(owners, vec![graph.lane_of(idx)], "node {}", graph.node(idx).id);
    }

    let names: Vec<_> = graph.lanes.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["app", "store", RESOURCE_LANE]);
    assert_eq!(graph.lanes.last().unwrap().kind, LaneKind::Resources);
}

#[test]
fn test_external_symbols_are_shared_across_modules() {
    let (entities, references) = mixed();
    let graph = assemble(&entities, &references);

    let loads = graph.find_node("json.loads").unwrap();
    assert_eq!(graph.in_degree(loads), 2);
    assert_eq!(graph.lane(graph.lane_of(loads)).unwrap().name, "app");
    let orders = graph.find_node("orders").unwrap();
    assert_eq!(graph.in_degree(orders), 2);
}

#[test]
fn test_unknown_internal_target_is_downgraded() {
    let entities = vec![function("m", "f")];
    let references = vec![call("m.f", "m.missing")];
    let assembly = GraphAssembler::new().assemble(&entities, &references).unwrap();

    assert_eq!(assembly.unresolved.len(), 1);
    assert_eq!(assembly.unresolved[0].source, "m.f");
    let graph = assembly.graph;
    let target = graph.find_node("missing").unwrap();
    assert_eq!(graph.node(target).kind, NodeKind::ExternalSymbol);
    assert_eq!(
        edge_tuples(&graph),
        vec![("m.f".to_string(), "missing".to_string(), EdgeKind::CallExternal)]
    );
}

#[test]
fn test_unknown_source_is_rejected() {
    let entities = vec![function("m", "f")];
    let references = vec![external("m.ghost", "print")];
    let err = GraphAssembler::new().assemble(&entities, &references).unwrap_err();
    assert_eq!(
        err,
        GraphError::UnknownSource {
            source_name: "m.ghost".into(),
            target: "print".into(),
        }
    );
}

#[test]
fn test_duplicate_entity_is_rejected() {
    let entities = vec![function("m", "f"), function("m", "f")];
    let err = GraphAssembler::new().assemble(&entities, &[]).unwrap_err();
    assert_eq!(err, GraphError::DuplicateEntity("m.f".into()));
}

#[test]
fn test_no_dangling_edges() {
    let (entities, references) = mixed();
    let graph = assemble(&entities, &references);
    for edge in graph.graph.edge_references() {
        assert!(graph.graph.node_weight(edge.source()).is_some());
        assert!(graph.graph.node_weight(edge.target()).is_some());
    }
}
