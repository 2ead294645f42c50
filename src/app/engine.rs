use crate::adapters::emit::build_emitter;
use crate::adapters::python::PythonAnalyzer;
use crate::adapters::test_detector::PythonTestDetector;
use crate::adapters::theme::ThemeRegistry;
use crate::app::dto::{DiagramConfig, EmitterOutcome, RunReport};
use crate::domain::builder::GraphAssembler;
use crate::domain::config::EmitterKind;
use crate::domain::entity::{Entity, EntityIndex, SourceUnit};
use crate::domain::error::{EmissionError, ParseError};
use crate::domain::graph::CallGraph;
use crate::domain::layout::{Layout, LayoutEngine};
use crate::domain::ports::{EdgeCollector, EntityExtractor, SourceReader};
use crate::domain::reference::{DataAccessIndex, DataAccessTag};
use anyhow::{Context as _, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything one run produced. Documents are keyed by emitter; a failed
/// emitter does not affect the others.
#[derive(Debug)]
pub struct RunOutput {
    pub report: RunReport,
    pub graph: CallGraph,
    pub layout: Layout,
    pub documents: BTreeMap<EmitterKind, Result<String, EmissionError>>,
}

/// Pipeline orchestration: read, extract, filter, collect, assemble, lay
/// out, emit.
pub struct DiagramEngine {
    config: DiagramConfig,
    source_reader: Arc<dyn SourceReader>,
    analyzer: PythonAnalyzer,
    test_detector: PythonTestDetector,
    themes: ThemeRegistry,
}

impl DiagramEngine {
    pub fn new(config: DiagramConfig, source_reader: Arc<dyn SourceReader>) -> Self {
        let analyzer = PythonAnalyzer::with_markers(config.data_access_markers.iter().cloned());
        let themes = config.theme_registry();
        Self {
            config,
            source_reader,
            analyzer,
            test_detector: PythonTestDetector,
            themes,
        }
    }

    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    /// Reads `paths` through the source reader and runs the pipeline.
    /// Unreadable files count as failed units.
    pub fn run(&self, paths: &[PathBuf], tags: Vec<DataAccessTag>) -> Result<RunOutput> {
        let mut seen = HashSet::new();
        let mut units = Vec::new();
        let mut failed = Vec::new();
        for path in paths {
            let shown = path.to_string_lossy().replace('\\', "/");
            if !seen.insert(shown.clone()) {
                debug!(path = %shown, "duplicate input path skipped");
                continue;
            }
            match self.source_reader.read(path) {
                Ok(text) => units.push(SourceUnit::new(shown, text)),
                Err(e) => {
                    warn!(path = %shown, error = %e, "source unit unreadable");
                    failed.push(ParseError::new(shown, 0, format!("{e:#}")));
                }
            }
        }
        let total = seen.len();
        let mut output = self.run_units(units, tags)?;
        output.report.total = total;
        failed.append(&mut output.report.failed);
        output.report.failed = failed;
        Ok(output)
    }

    /// Runs the pipeline over already-read units.
    pub fn run_units(&self, units: Vec<SourceUnit>, tags: Vec<DataAccessTag>) -> Result<RunOutput> {
        info!(units = units.len(), "analyzing source units");
        let mut report = RunReport {
            total: units.len(),
            ..RunReport::default()
        };

        // 1. Extraction, isolated per unit
        let mut extracted: Vec<(SourceUnit, Vec<Entity>)> = Vec::new();
        let mut module_paths: HashMap<String, String> = HashMap::new();
        let mut declared_by: HashMap<String, String> = HashMap::new();
        for unit in units {
            let module = unit.module_name();
            if let Some(first) = module_paths.get(&module) {
                warn!(path = %unit.path, module = %module, "module already provided by {first}");
                report.failed.push(ParseError::new(
                    &unit.path,
                    0,
                    format!("module `{module}` is already provided by {first}"),
                ));
                continue;
            }
            match self.analyzer.extract(&unit) {
                Ok(entities) => {
                    let clash = entities
                        .iter()
                        .find_map(|e| declared_by.get(&e.qualified_name).map(|first| (e, first)));
                    if let Some((entity, first)) = clash {
                        warn!(path = %unit.path, entity = %entity.qualified_name, "entity already declared by {first}");
                        report.failed.push(ParseError::new(
                            &unit.path,
                            entity.line(),
                            format!("`{}` is already declared by {first}", entity.qualified_name),
                        ));
                        continue;
                    }
                    for entity in &entities {
                        declared_by.insert(entity.qualified_name.clone(), unit.path.clone());
                    }
                    debug!(path = %unit.path, entities = entities.len(), "extracted");
                    module_paths.insert(module, unit.path.clone());
                    report.analyzed.push(unit.path.clone());
                    extracted.push((unit, entities));
                }
                Err(e) => {
                    warn!(path = %e.path, line = e.line, "skipping unit: {}", e.message);
                    report.failed.push(e);
                }
            }
        }

        // 2. Index over every extracted entity, then scope filtering
        let index = EntityIndex::new(extracted.iter().flat_map(|(_, entities)| entities));
        let filter = &self.config.filter;
        let extracted: Vec<(SourceUnit, Vec<Entity>)> = extracted
            .into_iter()
            .map(|(unit, entities)| {
                let kept = filter.retain_entities(entities, &module_paths, &self.test_detector);
                (unit, kept)
            })
            .collect();
        let kept: Vec<Entity> = extracted
            .iter()
            .flat_map(|(_, entities)| entities.iter().cloned())
            .collect();

        // 3. Data-access tags must name a kept callable
        let known: HashSet<&str> = kept.iter().map(|e| e.qualified_name.as_str()).collect();
        let (matched, unmatched): (Vec<_>, Vec<_>) = tags
            .into_iter()
            .partition(|tag| known.contains(tag.callable.as_str()));
        for tag in &unmatched {
            warn!(callable = %tag.callable, resource = %tag.resource, "data-access tag matches no entity");
        }
        report.unmatched_tags = unmatched;
        let tags = DataAccessIndex::new(matched);

        // 4. Edge collection
        let mut references = Vec::new();
        for (unit, entities) in &extracted {
            if entities.is_empty() {
                continue;
            }
            match self.analyzer.collect(unit, entities, &index, &tags) {
                Ok(records) => references.extend(records),
                Err(e) => {
                    warn!(path = %e.path, "edge collection failed: {}", e.message);
                    report.analyzed.retain(|p| p != &e.path);
                    report.failed.push(e);
                }
            }
        }
        let references = filter.retain_references(references, &kept);

        // 5. Assembly and layout are global
        let assembly = GraphAssembler::new()
            .assemble(&kept, &references)
            .context("Failed to assemble call graph")?;
        let graph = assembly.graph;
        report.unresolved = assembly.unresolved;
        report.node_count = graph.node_count();
        report.edge_count = graph.edge_count();
        report.lane_count = graph.lanes.len();
        info!(
            nodes = report.node_count,
            edges = report.edge_count,
            lanes = report.lane_count,
            "graph assembled"
        );

        let layout = LayoutEngine::new(self.config.to_layout_options())
            .compute(&graph)
            .context("Failed to lay out call graph")?;

        // 6. Emitters, each on its own
        let render = self.config.to_render_options();
        let mut documents = BTreeMap::new();
        for kind in self.config.selected_emitters() {
            let emitter = build_emitter(kind, &self.themes, &render);
            let result = emitter.emit(&graph, &layout);
            match &result {
                Ok(doc) => info!(emitter = kind.as_str(), bytes = doc.len(), "diagram emitted"),
                Err(e) => warn!(emitter = kind.as_str(), error = %e, "emitter failed"),
            }
            report.emitters.push(EmitterOutcome {
                emitter: kind,
                ok: result.is_ok(),
                error: result.as_ref().err().map(ToString::to_string),
            });
            documents.insert(kind, result);
        }

        Ok(RunOutput {
            report,
            graph,
            layout,
            documents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::SourceReader;
    use std::path::Path;

    struct MapReader(HashMap<String, String>);

    impl SourceReader for MapReader {
        fn read(&self, path: &Path) -> Result<String> {
            self.0
                .get(path.to_string_lossy().as_ref())
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no such file: {}", path.display()))
        }
    }

    fn engine(files: &[(&str, &str)], config: DiagramConfig) -> DiagramEngine {
        let map = files
            .iter()
            .map(|(p, t)| (p.to_string(), t.to_string()))
            .collect();
        DiagramEngine::new(config, Arc::new(MapReader(map)))
    }

    #[test]
    fn test_partial_success_reports_failed_units() {
        let engine = engine(
            &[
                ("app.py", "import util\n\ndef main():\n    util.helper()\n"),
                ("util.py", "def helper():\n    pass\n"),
                ("broken.py", "def oops(:\n"),
            ],
            DiagramConfig::default(),
        );
        let paths: Vec<PathBuf> = ["app.py", "util.py", "broken.py", "missing.py", "app.py"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let out = engine.run(&paths, vec![]).unwrap();
        assert_eq!(out.report.summary(), "2 of 4 files analyzed, 2 failed to parse");
        assert_eq!(out.report.failed[0].path, "missing.py");
        assert_eq!(out.report.failed[1].path, "broken.py");
        assert_eq!(out.report.lane_count, 2);
        assert!(out.documents.values().all(Result::is_ok));
    }

    #[test]
    fn test_entity_declared_by_two_units_fails_only_the_later_unit() {
        let engine = engine(
            &[
                ("a.py", "class b:\n    def f(self):\n        pass\n"),
                ("a/b.py", "def f():\n    pass\n\ndef g():\n    f()\n"),
                ("c.py", "def h():\n    pass\n"),
            ],
            DiagramConfig::default(),
        );
        let paths: Vec<PathBuf> = ["a.py", "a/b.py", "c.py"].iter().map(PathBuf::from).collect();
        let out = engine.run(&paths, vec![]).unwrap();

        assert_eq!(out.report.summary(), "2 of 3 files analyzed, 1 failed to parse");
        assert_eq!(out.report.failed[0].path, "a/b.py");
        assert_eq!(out.report.failed[0].line, 1);
        assert!(out.graph.find_node("a.b.f").is_some());
        assert!(out.graph.find_node("a.b.g").is_none());
        assert!(out.documents.values().all(Result::is_ok));
    }

    #[test]
    fn test_unmatched_tags_are_reported_and_dropped() {
        let engine = engine(
            &[("repo.py", "def save(db):\n    db.execute('insert')\n")],
            DiagramConfig::default(),
        );
        let tags = vec![
            DataAccessTag::new("repo.save", "insert", "orders"),
            DataAccessTag::new("repo.gone", "select", "users"),
        ];
        let out = engine.run(&[PathBuf::from("repo.py")], tags).unwrap();
        assert_eq!(out.report.unmatched_tags.len(), 1);
        assert_eq!(out.report.unmatched_tags[0].callable, "repo.gone");
        assert!(out.graph.find_node("orders").is_some());
        assert!(out.graph.find_node("users").is_none());
        assert!(out.graph.find_node("db.execute").is_none());
    }

    #[test]
    fn test_only_selected_emitters_run() {
        let config = DiagramConfig {
            emitters: vec![EmitterKind::FlowText],
            ..DiagramConfig::default()
        };
        let engine = engine(&[("a.py", "def f():\n    pass\n")], config);
        let out = engine.run(&[PathBuf::from("a.py")], vec![]).unwrap();
        assert_eq!(out.documents.len(), 1);
        assert!(out.documents.contains_key(&EmitterKind::FlowText));
        assert_eq!(out.report.emitters.len(), 1);
    }
}
