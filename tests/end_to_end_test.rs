//! End-to-end pipeline tests: Python sources in, diagram documents out.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use flowlanes::app::dto::DiagramConfig;
use flowlanes::app::engine::DiagramEngine;
use flowlanes::domain::config::{EmitterKind, LayoutMode};
use flowlanes::domain::edge::EdgeKind;
use flowlanes::domain::filter::ScopeFilter;
use flowlanes::domain::reference::DataAccessTag;
use pretty_assertions::assert_eq;

use common::mock::MockSourceReader;

const APP: &str = r#"
from shop import repo
from shop.repo import Repository
import logging

log = logging.getLogger(__name__)


def main():
    store = Repository()
    store.save({"id": 1})
    repo.summarize()
    log.info("done")


def _unused():
    pass


if __name__ == "__main__":
    main()
"#;

const REPO: &str = r#"
import sqlite3


class Repository:
    def __init__(self):
        self.conn = sqlite3.connect("shop.db")

    def save(self, order):
        self.validate(order)
        self.conn.execute("INSERT INTO orders VALUES (?)", (order,))

    def validate(self, order):
        if not order:
            raise ValueError("empty")


def summarize():
    conn = sqlite3.connect("shop.db")
    return conn.execute("SELECT count(*) FROM orders").fetchone()
"#;

const TESTS: &str = r#"
from shop.repo import summarize


def test_summarize():
    assert summarize() is not None
"#;

fn reader() -> MockSourceReader {
    MockSourceReader::new()
        .with_file("app.py", APP)
        .with_file("shop/repo.py", REPO)
        .with_file("tests/test_repo.py", TESTS)
}

fn tags() -> Vec<DataAccessTag> {
    vec![
        DataAccessTag::new("shop.repo.Repository.save", "insert", "orders"),
        DataAccessTag::new("shop.repo.summarize", "select", "orders"),
    ]
}

fn paths() -> Vec<PathBuf> {
    ["app.py", "shop/repo.py", "tests/test_repo.py"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

fn edge(out: &flowlanes::app::engine::RunOutput, source: &str, target: &str) -> Option<EdgeKind> {
    let s = out.graph.find_node(source)?;
    let t = out.graph.find_node(target)?;
    out.graph
        .neighbors(s)
        .find(|(n, _)| *n == t)
        .map(|(_, e)| e.kind)
}

#[test]
fn test_pipeline_builds_lanes_edges_and_documents() {
    let engine = DiagramEngine::new(DiagramConfig::default(), Arc::new(reader()));
    let out = engine.run(&paths(), tags()).unwrap();

    assert_eq!(out.report.summary(), "3 of 3 files analyzed, 0 failed to parse");
    let lanes: Vec<_> = out.graph.lanes.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(lanes, vec!["app", "shop.repo", "tests.test_repo", "DATASOURCES"]);

    assert_eq!(edge(&out, "app.__main__", "app.main"), Some(EdgeKind::CallInternal));
    assert_eq!(
        edge(&out, "app.main", "shop.repo.Repository.__init__"),
        Some(EdgeKind::CallInternal)
    );
    assert_eq!(edge(&out, "app.main", "shop.repo.summarize"), Some(EdgeKind::CallInternal));
    assert_eq!(edge(&out, "app.main", "log.info"), Some(EdgeKind::CallExternal));
    assert_eq!(
        edge(&out, "shop.repo.Repository.save", "shop.repo.Repository.validate"),
        Some(EdgeKind::CallInternal)
    );
    assert_eq!(edge(&out, "shop.repo.Repository.save", "orders"), Some(EdgeKind::DataAccess));
    assert_eq!(edge(&out, "shop.repo.summarize", "orders"), Some(EdgeKind::DataAccess));
    // Marker calls of tagged callables become data access, not external calls
    assert!(out.graph.find_node("self.conn.execute").is_none());
    assert!(out.graph.find_node("conn.execute").is_none());

    // `store.save` is duck-typed and stays external
    assert_eq!(edge(&out, "app.main", "store.save"), Some(EdgeKind::CallExternal));

    for kind in [EmitterKind::StructuralDiagram, EmitterKind::FlowText] {
        assert!(out.documents[&kind].is_ok(), "{}", kind.as_str());
    }
    assert!(out.report.emitters.iter().all(|e| e.ok));
}

#[test]
fn test_full_pipeline_is_byte_deterministic() {
    let config = DiagramConfig {
        layout_mode: LayoutMode::ColumnCapped,
        legend: true,
        ..DiagramConfig::default()
    };
    let first = DiagramEngine::new(config.clone(), Arc::new(reader()))
        .run(&paths(), tags())
        .unwrap();
    let second = DiagramEngine::new(config, Arc::new(reader()))
        .run(&paths(), tags())
        .unwrap();

    for kind in [EmitterKind::StructuralDiagram, EmitterKind::FlowText] {
        let a = first.documents[&kind].as_ref().unwrap();
        let b = second.documents[&kind].as_ref().unwrap();
        assert_eq!(a, b);
    }
    assert_eq!(first.layout, second.layout);
}

#[test]
fn test_parse_failure_is_isolated() {
    let reader = reader().with_file("broken.py", "def broken(:\n    pass\n");
    let engine = DiagramEngine::new(DiagramConfig::default(), Arc::new(reader));
    let mut paths = paths();
    paths.push(PathBuf::from("broken.py"));

    let out = engine.run(&paths, tags()).unwrap();
    assert_eq!(out.report.summary(), "3 of 4 files analyzed, 1 failed to parse");
    assert_eq!(out.report.failed[0].path, "broken.py");
    assert!(out.report.failed[0].line >= 1);
    assert!(out.graph.lane_by_name("broken").is_none());
    assert!(out.documents.values().all(Result::is_ok));
}

#[test]
fn test_scope_filter_hides_tests_and_private_entities() {
    let config = DiagramConfig {
        filter: ScopeFilter {
            hide_private: true,
            exclude_tests: true,
            ..ScopeFilter::default()
        },
        ..DiagramConfig::default()
    };
    let engine = DiagramEngine::new(config, Arc::new(reader()));
    let out = engine.run(&paths(), tags()).unwrap();

    assert!(out.graph.find_node("app._unused").is_none());
    assert!(out.graph.find_node("tests.test_repo.test_summarize").is_none());
    assert!(out.graph.lane_by_name("tests.test_repo").is_none());
    // Dunder methods count as private; only the entry guard is exempt
    assert!(out.graph.find_node("shop.repo.Repository.__init__").is_none());
    assert!(out.graph.find_node("app.__main__").is_some());
}

#[test]
fn test_excluded_targets_are_downgraded_to_external() {
    let config = DiagramConfig {
        filter: ScopeFilter {
            exclude_modules: vec!["shop.repo".into()],
            ..ScopeFilter::default()
        },
        ..DiagramConfig::default()
    };
    let engine = DiagramEngine::new(config, Arc::new(reader()));
    let out = engine.run(&paths(), vec![]).unwrap();

    assert!(out.graph.lane_by_name("shop.repo").is_none());
    assert_eq!(edge(&out, "app.main", "repo.summarize"), Some(EdgeKind::CallExternal));
    assert!(
        out.report
            .unresolved
            .iter()
            .any(|u| u.source == "app.main" && u.symbol == "repo.summarize")
    );
}
