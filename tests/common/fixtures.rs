//! Test fixture generators for integration tests.
#![allow(dead_code)]

use flowlanes::domain::builder::GraphAssembler;
use flowlanes::domain::config::LayoutOptions;
use flowlanes::domain::entity::{Entity, EntityScope, SourceSpan};
use flowlanes::domain::graph::CallGraph;
use flowlanes::domain::layout::{Layout, LayoutEngine};
use flowlanes::domain::reference::{DataAccessTag, ReferenceRecord};

fn default_span() -> SourceSpan {
    SourceSpan {
        start_byte: 0,
        end_byte: 10,
        line: 1,
    }
}

/// Module-level function `module.name`.
pub fn function(module: &str, name: &str) -> Entity {
    Entity {
        qualified_name: format!("{module}.{name}"),
        module: module.to_string(),
        name: name.to_string(),
        scope: EntityScope::Module,
        param_count: 0,
        spans: vec![default_span()],
    }
}

/// Method `module.class.name`.
pub fn method(module: &str, class: &str, name: &str) -> Entity {
    Entity {
        qualified_name: format!("{module}.{class}.{name}"),
        module: module.to_string(),
        name: name.to_string(),
        scope: EntityScope::Class(class.to_string()),
        param_count: 1,
        spans: vec![default_span()],
    }
}

/// Entry guard `module.__main__`.
pub fn entry_guard(module: &str) -> Entity {
    Entity {
        qualified_name: format!("{module}.__main__"),
        module: module.to_string(),
        name: "__main__".to_string(),
        scope: EntityScope::EntryGuard,
        param_count: 0,
        spans: vec![default_span()],
    }
}

/// Resolved call from `source` to the internal entity `target`, labelled with
/// the target's short name.
pub fn call(source: &str, target: &str) -> ReferenceRecord {
    let short = target.rsplit('.').next().unwrap_or(target).to_string();
    ReferenceRecord::internal(source, short.clone(), target, Some(short))
}

pub fn external(source: &str, symbol: &str) -> ReferenceRecord {
    let short = symbol.rsplit('.').next().unwrap_or(symbol).to_string();
    ReferenceRecord::external(source, symbol, Some(short))
}

pub fn data_access(source: &str, operation: &str, resource: &str) -> ReferenceRecord {
    ReferenceRecord::data_access(source, &DataAccessTag::new(source, operation, resource))
}

/// Scenario A: `m.f -> m.g -> lib.x`.
pub fn scenario_a() -> (Vec<Entity>, Vec<ReferenceRecord>) {
    (
        vec![function("m", "f"), function("m", "g")],
        vec![call("m.f", "m.g"), external("m.g", "lib.x")],
    )
}

/// Scenario C: `m.a <-> m.b`.
pub fn scenario_c() -> (Vec<Entity>, Vec<ReferenceRecord>) {
    (
        vec![function("m", "a"), function("m", "b")],
        vec![call("m.a", "m.b"), call("m.b", "m.a")],
    )
}

/// Two modules, a cycle, an external call, data access and an entry guard.
pub fn mixed() -> (Vec<Entity>, Vec<ReferenceRecord>) {
    let entities = vec![
        function("app", "main"),
        function("app", "load"),
        entry_guard("app"),
        method("store", "Repo", "save"),
        method("store", "Repo", "validate"),
        function("store", "retry"),
    ];
    let references = vec![
        call("app.__main__", "app.main"),
        call("app.main", "app.load"),
        call("app.main", "store.Repo.save"),
        external("app.load", "json.loads"),
        call("store.Repo.save", "store.Repo.validate"),
        call("store.Repo.save", "store.retry"),
        call("store.retry", "store.Repo.save"),
        data_access("store.Repo.save", "insert", "orders"),
        data_access("app.load", "select", "orders"),
        external("store.Repo.validate", "json.loads"),
    ];
    (entities, references)
}

pub fn assemble(entities: &[Entity], references: &[ReferenceRecord]) -> CallGraph {
    GraphAssembler::new()
        .assemble(entities, references)
        .expect("assembly")
        .graph
}

pub fn layout(graph: &CallGraph, options: LayoutOptions) -> Layout {
    LayoutEngine::new(options).compute(graph).expect("layout")
}
