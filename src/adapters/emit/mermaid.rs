//! Flow-text emitter: a Mermaid `flowchart TD` with one subgraph per lane.
//!
//! Mermaid has no waypoints or line jumps; routes collapse to the chosen
//! curve and jump hints are listed in a comment.

use super::{NodeIds, lane_id, mermaid_escape};
use crate::adapters::theme::Theme;
use crate::domain::config::{EdgeStyle, EmitterKind, RenderOptions, SizeMode};
use crate::domain::edge::EdgeKind;
use crate::domain::error::EmissionError;
use crate::domain::graph::CallGraph;
use crate::domain::layout::Layout;
use crate::domain::node::NodeKind;
use crate::domain::ports::DiagramEmitter;
use petgraph::visit::EdgeRef;

const FORMAT: &str = "mermaid";

pub struct MermaidEmitter {
    theme: Theme,
    options: RenderOptions,
}

impl MermaidEmitter {
    pub fn new(theme: Theme, options: RenderOptions) -> Self {
        Self { theme, options }
    }
}

fn arrow(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::CallInternal => "-->",
        EdgeKind::CallExternal => "-.->",
        EdgeKind::DataAccess => "==>",
    }
}

impl DiagramEmitter for MermaidEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::FlowText
    }

    fn emit(&self, graph: &CallGraph, layout: &Layout) -> Result<String, EmissionError> {
        let ids = NodeIds::new(graph);
        let t = &self.theme;
        let curve = match layout.edge_style {
            EdgeStyle::Direct => "linear",
            EdgeStyle::Orthogonal => "stepAfter",
        };
        let mut out = vec![
            format!("%%{{init: {{'flowchart': {{'curve': '{curve}'}}}}}}%%"),
            "flowchart TD".to_string(),
        ];

        let mut entries = Vec::new();
        let mut externals = Vec::new();
        let mut resources = Vec::new();
        let mut strokes = Vec::new();

        for lane_box in &layout.lanes {
            let Some(lane) = graph.lane(lane_box.lane) else {
                continue;
            };
            let title = mermaid_escape(FORMAT, &format!("lane `{}`", lane.name), &lane.name)?;
            out.push(format!("    subgraph {}[\"{title}\"]", lane_id(lane_box.lane)));
            for idx in layout.lane_order(graph, lane_box.lane) {
                let node = graph.node(idx);
                let placement = layout.placement(idx).ok_or_else(|| EmissionError::MissingPosition {
                    format: FORMAT,
                    node: node.id.clone(),
                })?;
                let id = ids.get(idx);
                let label = mermaid_escape(FORMAT, &format!("node `{}`", node.id), &node.label)?;
                let shape = match node.kind {
                    NodeKind::InternalFunction => format!("{id}[\"{label}\"]"),
                    NodeKind::ExternalSymbol => {
                        externals.push(id);
                        format!("{id}([\"{label}\"])")
                    }
                    NodeKind::DataResource => {
                        resources.push(id);
                        format!("{id}[(\"{label}\")]")
                    }
                };
                out.push(format!("        {shape}"));
                if layout.is_entry(idx) {
                    entries.push(id);
                }
                if layout.size_mode == SizeMode::DegreeBased && placement.weight > 1.0 {
                    strokes.push(format!("    style {id} stroke-width:{:.1}px", placement.weight));
                }
            }
            out.push("    end".into());
        }

        let mut back_links = Vec::new();
        let mut jump_links = Vec::new();
        for (n, edge) in graph.graph.edge_references().enumerate() {
            let source = ids.get(edge.source());
            let target = ids.get(edge.target());
            let line = match &edge.weight().label {
                Some(label) => {
                    let item = format!("edge `{source}` -> `{target}`");
                    let label = mermaid_escape(FORMAT, &item, label)?;
                    format!("    {source} {}|\"{label}\"| {target}", arrow(edge.weight().kind))
                }
                None => format!("    {source} {} {target}", arrow(edge.weight().kind)),
            };
            out.push(line);
            if layout.is_back_edge(edge.id()) {
                back_links.push(n);
            }
            if layout.route(edge.id()).is_some_and(|r| r.jumps) {
                jump_links.push(n.to_string());
            }
        }

        for n in &back_links {
            out.push(format!("    linkStyle {n} stroke:{},stroke-width:2px", t.back_edge));
        }

        out.push(format!(
            "    classDef entry stroke:{},stroke-width:2px,stroke-dasharray:4 2;",
            t.entry_stroke
        ));
        out.push(format!(
            "    classDef external fill:{},stroke:{},stroke-dasharray:3 3;",
            t.external_fill, t.external_stroke
        ));
        out.push(format!(
            "    classDef resource fill:{},stroke:{};",
            t.resource_fill, t.resource_stroke
        ));
        for (class, members) in [("entry", &entries), ("external", &externals), ("resource", &resources)] {
            if !members.is_empty() {
                out.push(format!("    class {} {class}", members.join(",")));
            }
        }
        out.extend(strokes);

        if layout.line_jumps && !jump_links.is_empty() {
            out.push(format!("    %% line jumps on links: {}", jump_links.join(", ")));
        }
        if self.options.legend {
            out.push("    %% legend:".into());
            out.push("    %%   --> call (same module)".into());
            out.push("    %%   -.-> call (external)".into());
            out.push("    %%   ==> data access".into());
            out.push(format!("    %%   {} back edge", t.back_edge));
        }

        let mut doc = out.join("\n");
        doc.push('\n');
        Ok(doc)
    }
}
