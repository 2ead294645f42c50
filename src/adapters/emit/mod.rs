//! Diagram emitters sharing one layout model and one node-id map.

pub mod drawio;
pub mod mermaid;

pub use drawio::DrawioEmitter;
pub use mermaid::MermaidEmitter;

use crate::adapters::theme::ThemeRegistry;
use crate::domain::config::{EmitterKind, RenderOptions};
use crate::domain::error::EmissionError;
use crate::domain::graph::CallGraph;
use crate::domain::node::NodeKind;
use crate::domain::ports::DiagramEmitter;
use petgraph::graph::NodeIndex;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn unsafe_id_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]+").expect("id sanitizing regex"))
}

/// Stable document ids for every node: a kind prefix plus the sanitized node
/// id, suffixed on collision. Both emitters use the same map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIds {
    ids: Vec<String>,
}

impl NodeIds {
    pub fn new(graph: &CallGraph) -> Self {
        let mut used = HashSet::new();
        let ids = graph
            .graph
            .node_indices()
            .map(|idx| {
                let node = graph.node(idx);
                let prefix = match node.kind {
                    NodeKind::InternalFunction => "fn",
                    NodeKind::ExternalSymbol => "ext",
                    NodeKind::DataResource => "db",
                };
                let base = format!("{prefix}_{}", unsafe_id_chars().replace_all(&node.id, "_"));
                let mut id = base.clone();
                let mut n = 2;
                while !used.insert(id.clone()) {
                    id = format!("{base}_{n}");
                    n += 1;
                }
                id
            })
            .collect();
        Self { ids }
    }

    pub fn get(&self, idx: NodeIndex) -> &str {
        self.ids.get(idx.index()).map(String::as_str).unwrap_or("")
    }
}

/// Document id of a lane container.
pub fn lane_id(lane: usize) -> String {
    format!("lane_{lane}")
}

/// Characters no diagram format can carry.
fn check_representable(format: &'static str, item: &str, text: &str) -> Result<(), EmissionError> {
    match text.chars().find(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r')) {
        Some(c) => Err(EmissionError::Unrepresentable {
            format,
            item: item.to_string(),
            reason: format!("control character U+{:04X}", c as u32),
        }),
        None => Ok(()),
    }
}

/// Escapes `text` for an XML attribute value.
pub fn xml_escape(format: &'static str, item: &str, text: &str) -> Result<String, EmissionError> {
    check_representable(format, item, text)?;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Escapes `text` for a quoted Mermaid string.
pub fn mermaid_escape(format: &'static str, item: &str, text: &str) -> Result<String, EmissionError> {
    check_representable(format, item, text)?;
    Ok(text
        .replace('"', "#quot;")
        .replace(['\n', '\r', '\t'], " "))
}

/// Builds the emitter for `kind` with the resolved theme.
pub fn build_emitter(
    kind: EmitterKind,
    themes: &ThemeRegistry,
    options: &RenderOptions,
) -> Box<dyn DiagramEmitter> {
    let theme = themes.resolve(&options.theme);
    match kind {
        EmitterKind::StructuralDiagram => Box::new(DrawioEmitter::new(theme, options.clone())),
        EmitterKind::FlowText => Box::new(MermaidEmitter::new(theme, options.clone())),
    }
}
