//! Named style presets, injected read-only into the emitters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

pub const DEFAULT_THEME: &str = "default";

/// Colours used by both emitters. Missing fields in a user preset fall back
/// to the default palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub lane_fill: String,
    pub lane_stroke: String,
    pub resource_lane_fill: String,
    pub function_fill: String,
    pub function_stroke: String,
    pub entry_stroke: String,
    pub external_fill: String,
    pub external_stroke: String,
    pub resource_fill: String,
    pub resource_stroke: String,
    pub call_edge: String,
    pub external_edge: String,
    pub data_edge: String,
    pub back_edge: String,
    pub font_color: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            lane_fill: "#f5f7fa".into(),
            lane_stroke: "#8a99ad".into(),
            resource_lane_fill: "#fdf6e3".into(),
            function_fill: "#dae8fc".into(),
            function_stroke: "#6c8ebf".into(),
            entry_stroke: "#2d5a8c".into(),
            external_fill: "#f5f5f5".into(),
            external_stroke: "#999999".into(),
            resource_fill: "#fff2cc".into(),
            resource_stroke: "#d6b656".into(),
            call_edge: "#333333".into(),
            external_edge: "#888888".into(),
            data_edge: "#b85450".into(),
            back_edge: "#c0392b".into(),
            font_color: "#1a1a1a".into(),
        }
    }
}

/// Theme lookup table keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRegistry {
    themes: BTreeMap<String, Theme>,
}

impl ThemeRegistry {
    /// Registry holding only the built-in `default` theme.
    pub fn builtin() -> Self {
        let mut themes = BTreeMap::new();
        themes.insert(DEFAULT_THEME.to_string(), Theme::default());
        Self { themes }
    }

    /// Built-ins plus `extra`; an extra preset named `default` replaces the
    /// built-in one.
    pub fn with_extra(extra: impl IntoIterator<Item = (String, Theme)>) -> Self {
        let mut registry = Self::builtin();
        registry.themes.extend(extra);
        registry
    }

    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.themes.get(name)
    }

    /// The named theme, or the default one with a warning.
    pub fn resolve(&self, name: &str) -> Theme {
        match self.themes.get(name) {
            Some(theme) => theme.clone(),
            None => {
                warn!(theme = name, "unknown theme; using default");
                self.themes.get(DEFAULT_THEME).cloned().unwrap_or_default()
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
