//! Error taxonomy for the pipeline.
//!
//! Extraction failures are per unit and isolated; assembly and layout failures
//! are global; emission failures only take down the emitter that raised them.

use serde::Serialize;
use thiserror::Error;

/// A source unit could not be structurally analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("failed to parse {path} at line {line}: {message}")]
pub struct ParseError {
    pub path: String,
    /// 1-based line of the first offending token (0 when unknown).
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(path: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

/// Graph assembly invariant violations. These abort the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("entity `{0}` is declared by more than one source unit")]
    DuplicateEntity(String),

    #[error("reference from `{source_name}` to `{target}` has no extracted source entity")]
    UnknownSource { source_name: String, target: String },
}

/// Layout invariant violations. These abort the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("node `{0}` does not belong to any lane")]
    NodeWithoutLane(String),

    #[error("node `{0}` belongs to more than one lane")]
    NodeInSeveralLanes(String),
}

/// A target format cannot represent a node or edge losslessly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmissionError {
    #[error("{format}: {item} cannot be represented: {reason}")]
    Unrepresentable {
        format: &'static str,
        item: String,
        reason: String,
    },

    #[error("{format}: node `{node}` has no layout position")]
    MissingPosition { format: &'static str, node: String },
}

/// A reference that could not be classified as written and was kept as a
/// call-external edge instead. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    pub source: String,
    pub symbol: String,
    pub reason: String,
}
