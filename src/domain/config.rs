//! Layout and rendering options.
//!
//! Enum names serialize in `snake_case` so the same spelling works in the JSON
//! configuration file and on the command line.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// One visual row per (lane, rank), wrapped at the column bound.
    #[default]
    Layered,
    /// Each lane flattened in (rank, column) order and packed into rows of
    /// at most `max_columns_per_lane` nodes.
    ColumnCapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RankOrigin {
    /// Nodes without same-lane callers, plus entry hints.
    #[default]
    InDegreeZero,
    /// Only the configured `entry_points`, plus entry hints.
    ExplicitEntries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ArrowStyle {
    #[default]
    Block,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStyle {
    Direct,
    #[default]
    Orthogonal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SizeMode {
    #[default]
    Uniform,
    DegreeBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EmitterKind {
    /// draw.io swimlane document
    StructuralDiagram,
    /// Mermaid flowchart
    FlowText,
}

impl EmitterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmitterKind::StructuralDiagram => "structural_diagram",
            EmitterKind::FlowText => "flow_text",
        }
    }
}

/// Options consumed by the layout engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutOptions {
    pub mode: LayoutMode,
    pub rank_origin: RankOrigin,
    pub entry_points: Vec<String>,
    /// 0 means unbounded in layered mode and 3 in column-capped mode.
    pub max_columns_per_lane: usize,
    pub crossing_passes: usize,
    pub size_mode: SizeMode,
    pub edge_style: EdgeStyle,
    pub line_jumps: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            mode: LayoutMode::default(),
            rank_origin: RankOrigin::default(),
            entry_points: Vec::new(),
            max_columns_per_lane: 0,
            crossing_passes: 4,
            size_mode: SizeMode::default(),
            edge_style: EdgeStyle::default(),
            line_jumps: true,
        }
    }
}

/// Options consumed by the emitters. Edge style and line jumps travel with
/// the layout itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub theme: String,
    pub arrow_style: ArrowStyle,
    pub legend: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            arrow_style: ArrowStyle::default(),
            legend: false,
        }
    }
}
