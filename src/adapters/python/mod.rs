//! Python front end: entity extraction and edge collection over a
//! tree-sitter parse.

mod collector;
mod extractor;
mod imports;

pub use imports::ImportMap;

use crate::domain::entity::{Entity, EntityIndex, SourceUnit};
use crate::domain::error::ParseError;
use crate::domain::ports::{EdgeCollector, EntityExtractor};
use crate::domain::reference::{DataAccessIndex, ReferenceRecord};
use tree_sitter::{Node, Parser, Tree};

/// Method names that stand for query execution by default.
pub const DEFAULT_DATA_ACCESS_MARKERS: &[&str] = &["execute", "executemany", "executescript"];

/// Python implementation of the extraction ports.
#[derive(Debug, Clone)]
pub struct PythonAnalyzer {
    data_access_markers: Vec<String>,
}

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self::with_markers(DEFAULT_DATA_ACCESS_MARKERS.iter().map(|m| m.to_string()))
    }

    pub fn with_markers(markers: impl IntoIterator<Item = String>) -> Self {
        Self {
            data_access_markers: markers.into_iter().collect(),
        }
    }

    pub fn data_access_markers(&self) -> &[String] {
        &self.data_access_markers
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor for PythonAnalyzer {
    fn extract(&self, unit: &SourceUnit) -> Result<Vec<Entity>, ParseError> {
        let tree = parse_tree(unit)?;
        Ok(extractor::extract_entities(
            tree.root_node(),
            unit.text.as_bytes(),
            &unit.module_name(),
        ))
    }
}

impl EdgeCollector for PythonAnalyzer {
    fn collect(
        &self,
        unit: &SourceUnit,
        entities: &[Entity],
        index: &EntityIndex,
        tags: &DataAccessIndex,
    ) -> Result<Vec<ReferenceRecord>, ParseError> {
        let tree = parse_tree(unit)?;
        let source = unit.text.as_bytes();
        let module = unit.module_name();
        let imports = ImportMap::collect(tree.root_node(), source);
        let collector = collector::Collector {
            module: &module,
            source,
            index,
            imports: &imports,
            markers: &self.data_access_markers,
        };
        Ok(entities
            .iter()
            .flat_map(|entity| collector.references(tree.root_node(), entity, tags))
            .collect())
    }
}

/// Parses one unit, failing on any ERROR or MISSING node.
pub(crate) fn parse_tree(unit: &SourceUnit) -> Result<Tree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ParseError::new(&unit.path, 0, format!("Failed to set language: {e}")))?;
    let tree = parser
        .parse(&unit.text, None)
        .ok_or_else(|| ParseError::new(&unit.path, 0, "parser produced no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error(root).start_position().row + 1;
        return Err(ParseError::new(&unit.path, line, "invalid syntax"));
    }
    Ok(tree)
}

fn first_error(node: Node) -> Node {
    if node.is_error() || node.is_missing() {
        return node;
    }
    let mut cursor = node.walk();
    let culprit = node
        .children(&mut cursor)
        .find(|child| child.has_error() || child.is_missing());
    match culprit {
        Some(child) => first_error(child),
        None => node,
    }
}

pub(crate) fn node_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_string()
}

/// Node text with every whitespace run collapsed to nothing, so multi-line
/// callee expressions keep one stable spelling.
pub(crate) fn collapsed_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source)
        .unwrap_or_default()
        .split_whitespace()
        .collect::<String>()
}
