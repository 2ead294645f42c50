use crate::adapters::python::DEFAULT_DATA_ACCESS_MARKERS;
use crate::adapters::theme::{DEFAULT_THEME, Theme, ThemeRegistry};
use crate::domain::config::{
    ArrowStyle, EdgeStyle, EmitterKind, LayoutMode, LayoutOptions, RankOrigin, RenderOptions,
    SizeMode,
};
use crate::domain::error::{ParseError, UnresolvedReference};
use crate::domain::filter::ScopeFilter;
use crate::domain::reference::DataAccessTag;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Run configuration, loaded from JSON and overridden from the command line.
/// Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub layout_mode: LayoutMode,
    pub rank_origin: RankOrigin,
    pub entry_points: Vec<String>,
    pub theme: String,
    /// Extra presets merged into the built-in theme registry.
    pub themes: BTreeMap<String, Theme>,
    pub arrow_style: ArrowStyle,
    pub edge_style: EdgeStyle,
    pub line_jumps: bool,
    pub size_mode: SizeMode,
    pub legend: bool,
    pub max_columns_per_lane: usize,
    pub crossing_passes: usize,
    pub emitters: Vec<EmitterKind>,
    pub data_access_markers: Vec<String>,
    pub filter: ScopeFilter,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        let layout = LayoutOptions::default();
        Self {
            layout_mode: layout.mode,
            rank_origin: layout.rank_origin,
            entry_points: layout.entry_points,
            theme: DEFAULT_THEME.to_string(),
            themes: BTreeMap::new(),
            arrow_style: ArrowStyle::default(),
            edge_style: layout.edge_style,
            line_jumps: layout.line_jumps,
            size_mode: layout.size_mode,
            legend: false,
            max_columns_per_lane: layout.max_columns_per_lane,
            crossing_passes: layout.crossing_passes,
            emitters: vec![EmitterKind::StructuralDiagram, EmitterKind::FlowText],
            data_access_markers: DEFAULT_DATA_ACCESS_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            filter: ScopeFilter::default(),
        }
    }
}

impl DiagramConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn to_layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            mode: self.layout_mode,
            rank_origin: self.rank_origin,
            entry_points: self.entry_points.clone(),
            max_columns_per_lane: self.max_columns_per_lane,
            crossing_passes: self.crossing_passes,
            size_mode: self.size_mode,
            edge_style: self.edge_style,
            line_jumps: self.line_jumps,
        }
    }

    pub fn to_render_options(&self) -> RenderOptions {
        RenderOptions {
            theme: self.theme.clone(),
            arrow_style: self.arrow_style,
            legend: self.legend,
        }
    }

    pub fn theme_registry(&self) -> ThemeRegistry {
        ThemeRegistry::with_extra(self.themes.clone())
    }

    /// Selected emitters in a fixed order, without repeats.
    pub fn selected_emitters(&self) -> Vec<EmitterKind> {
        let mut kinds = self.emitters.clone();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}

/// Loads pre-tagged data-access records from a JSON array of
/// `{callable, operation, resource}` objects.
pub fn load_data_access_tags(path: &Path) -> Result<Vec<DataAccessTag>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data-access file: {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse data-access file: {}", path.display()))
}

/// Outcome of one emitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmitterOutcome {
    pub emitter: EmitterKind,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Distinct source units requested.
    pub total: usize,
    /// Paths that were read and parsed.
    pub analyzed: Vec<String>,
    pub failed: Vec<ParseError>,
    pub unresolved: Vec<UnresolvedReference>,
    /// Data-access tags whose callable matched no kept entity.
    pub unmatched_tags: Vec<DataAccessTag>,
    pub node_count: usize,
    pub edge_count: usize,
    pub lane_count: usize,
    pub emitters: Vec<EmitterOutcome>,
}

impl RunReport {
    /// "N of M files analyzed, K failed to parse".
    pub fn summary(&self) -> String {
        format!(
            "{} of {} files analyzed, {} failed to parse",
            self.analyzed.len(),
            self.total,
            self.failed.len()
        )
    }

    pub fn all_emitters_failed(&self) -> bool {
        !self.emitters.is_empty() && self.emitters.iter().all(|e| !e.ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: DiagramConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DiagramConfig::default());
        assert_eq!(config.to_layout_options(), LayoutOptions::default());
        assert_eq!(config.to_render_options(), RenderOptions::default());
        assert_eq!(
            config.selected_emitters(),
            vec![EmitterKind::StructuralDiagram, EmitterKind::FlowText]
        );
    }

    #[test]
    fn test_config_fields_parse_in_snake_case() {
        let config: DiagramConfig = serde_json::from_str(
            r##"{
                "layout_mode": "column_capped",
                "rank_origin": "explicit_entries",
                "entry_points": ["app.main"],
                "edge_style": "direct",
                "size_mode": "degree_based",
                "arrow_style": "open",
                "emitters": ["flow_text", "flow_text"],
                "themes": {"dark": {"lane_fill": "#111111"}},
                "filter": {"hide_private": true}
            }"##,
        )
        .unwrap();
        assert_eq!(config.layout_mode, LayoutMode::ColumnCapped);
        assert_eq!(config.rank_origin, RankOrigin::ExplicitEntries);
        assert_eq!(config.selected_emitters(), vec![EmitterKind::FlowText]);
        assert!(config.filter.hide_private);
        assert!(config.line_jumps);
        assert_eq!(config.theme_registry().resolve("dark").lane_fill, "#111111");
    }

    #[test]
    fn test_summary_line() {
        let report = RunReport {
            total: 5,
            analyzed: vec!["a.py".into(), "b.py".into(), "c.py".into()],
            failed: vec![ParseError::new("d.py", 1, "x"), ParseError::new("e.py", 2, "y")],
            ..RunReport::default()
        };
        assert_eq!(report.summary(), "3 of 5 files analyzed, 2 failed to parse");
        assert!(!report.all_emitters_failed());
    }
}
