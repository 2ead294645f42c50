use crate::domain::config::EmitterKind;
use crate::domain::entity::{Entity, EntityIndex, SourceUnit};
use crate::domain::error::{EmissionError, ParseError};
use crate::domain::graph::CallGraph;
use crate::domain::layout::Layout;
use crate::domain::reference::{DataAccessIndex, ReferenceRecord};
use anyhow::Result;
use std::path::Path;

/// Source code reader port
pub trait SourceReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<String>;
}

/// Entity extraction port (implemented per source language)
pub trait EntityExtractor {
    /// Callable units of one source unit, in declaration order.
    fn extract(&self, unit: &SourceUnit) -> Result<Vec<Entity>, ParseError>;
}

/// Edge collection port (implemented per source language)
pub trait EdgeCollector {
    /// Outbound references of `entities`, all declared in `unit`, resolved
    /// against the run-wide `index`.
    fn collect(
        &self,
        unit: &SourceUnit,
        entities: &[Entity],
        index: &EntityIndex,
        tags: &DataAccessIndex,
    ) -> Result<Vec<ReferenceRecord>, ParseError>;
}

/// Test code recognition, per language convention
pub trait TestDetector: Send + Sync {
    /// `symbol` is the in-module path of an entity (`Class.method`), or empty
    /// when only the file is being classified.
    fn is_test_code(&self, symbol: &str, file_path: &str) -> bool;

    /// Get the language this detector is for
    fn language(&self) -> &str;
}

/// Diagram output port. Emitters never mutate the graph or the layout.
pub trait DiagramEmitter {
    fn kind(&self) -> EmitterKind;

    fn emit(&self, graph: &CallGraph, layout: &Layout) -> Result<String, EmissionError>;
}
