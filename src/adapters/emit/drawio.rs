//! Structural diagram emitter: a draw.io `mxfile` with one swimlane per lane.

use super::{NodeIds, lane_id, xml_escape};
use crate::adapters::theme::Theme;
use crate::domain::config::{ArrowStyle, EdgeStyle, EmitterKind, RenderOptions, SizeMode};
use crate::domain::edge::EdgeKind;
use crate::domain::error::EmissionError;
use crate::domain::graph::{CallGraph, LaneKind};
use crate::domain::layout::{LANE_X, Layout};
use crate::domain::node::{Node, NodeKind};
use crate::domain::ports::DiagramEmitter;
use petgraph::visit::EdgeRef;

const FORMAT: &str = "drawio";
const LEGEND_HEIGHT: i32 = 150;
const LEGEND_WIDTH: i32 = 260;

pub struct DrawioEmitter {
    theme: Theme,
    options: RenderOptions,
}

impl DrawioEmitter {
    pub fn new(theme: Theme, options: RenderOptions) -> Self {
        Self { theme, options }
    }

    fn lane_style(&self, kind: LaneKind) -> String {
        let fill = match kind {
            LaneKind::Module => &self.theme.lane_fill,
            LaneKind::Resources => &self.theme.resource_lane_fill,
        };
        format!(
            "swimlane;horizontal=1;startSize=28;fontStyle=1;rounded=1;html=1;fillColor={fill};strokeColor={};fontColor={};",
            self.theme.lane_stroke, self.theme.font_color
        )
    }

    fn node_style(&self, node: &Node, is_entry: bool, weight: f64, size_mode: SizeMode) -> String {
        let t = &self.theme;
        let mut style = match node.kind {
            NodeKind::InternalFunction => format!(
                "rounded=1;whiteSpace=wrap;html=1;fontSize=13;fillColor={};strokeColor={};",
                t.function_fill,
                if is_entry { &t.entry_stroke } else { &t.function_stroke }
            ),
            NodeKind::ExternalSymbol => format!(
                "rounded=1;whiteSpace=wrap;html=1;fontSize=12;dashed=1;fillColor={};strokeColor={};",
                t.external_fill, t.external_stroke
            ),
            NodeKind::DataResource => format!(
                "shape=cylinder3;whiteSpace=wrap;html=1;fontStyle=1;boundedLbl=1;fillColor={};strokeColor={};",
                t.resource_fill, t.resource_stroke
            ),
        };
        style.push_str(&format!("fontColor={};", t.font_color));
        let stroke = match size_mode {
            SizeMode::Uniform => 1.0,
            SizeMode::DegreeBased => weight.round(),
        };
        let stroke = if is_entry { stroke + 1.0 } else { stroke };
        style.push_str(&format!("strokeWidth={stroke};"));
        style
    }

    fn edge_style(&self, kind: EdgeKind, back: bool, jumps: bool, edge_style: EdgeStyle) -> String {
        let t = &self.theme;
        let mut style = match self.options.arrow_style {
            ArrowStyle::Block => "endArrow=block;endFill=1;".to_string(),
            ArrowStyle::Open => "endArrow=open;endFill=0;".to_string(),
        };
        style.push_str(match edge_style {
            EdgeStyle::Orthogonal => "edgeStyle=orthogonalEdgeStyle;rounded=1;",
            EdgeStyle::Direct => "edgeStyle=none;rounded=0;",
        });
        style.push_str("html=1;");
        let color = if back {
            &t.back_edge
        } else {
            match kind {
                EdgeKind::CallInternal => &t.call_edge,
                EdgeKind::CallExternal => &t.external_edge,
                EdgeKind::DataAccess => &t.data_edge,
            }
        };
        style.push_str(&format!("strokeColor={color};"));
        match kind {
            EdgeKind::CallInternal => {}
            EdgeKind::CallExternal => style.push_str("dashed=1;"),
            EdgeKind::DataAccess => style.push_str("dashed=1;dashPattern=1 3;strokeWidth=2;"),
        }
        if jumps {
            style.push_str("jumpStyle=arc;jumpSize=8;");
        }
        style
    }

    fn legend(&self, top: i32, out: &mut Vec<String>) {
        let t = &self.theme;
        out.push(format!(
            r#"        <mxCell id="legend" value="Legend" style="swimlane;horizontal=1;startSize=24;fontStyle=1;rounded=1;html=1;fillColor=#ffffff;strokeColor={};" vertex="1" parent="1">"#,
            t.lane_stroke
        ));
        out.push(format!(
            r#"          <mxGeometry x="{LANE_X}" y="{top}" width="{LEGEND_WIDTH}" height="{LEGEND_HEIGHT}" as="geometry"/>"#
        ));
        out.push("        </mxCell>".into());
        let rows = [
            ("legend_call", "call (same module)", t.call_edge.as_str(), ""),
            ("legend_external", "call (external)", t.external_edge.as_str(), "dashed=1;"),
            ("legend_data", "data access", t.data_edge.as_str(), "dashed=1;dashPattern=1 3;"),
            ("legend_back", "back edge", t.back_edge.as_str(), ""),
        ];
        for (i, (id, text, color, dash)) in rows.iter().enumerate() {
            let y = 34 + i as i32 * 28;
            out.push(format!(
                r#"        <mxCell id="{id}" value="{text}" style="text;html=1;align=left;verticalAlign=middle;fontColor={color};strokeColor={color};{dash}" vertex="1" parent="legend">"#
            ));
            out.push(format!(
                r#"          <mxGeometry x="12" y="{y}" width="{}" height="22" as="geometry"/>"#,
                LEGEND_WIDTH - 24
            ));
            out.push("        </mxCell>".into());
        }
    }
}

impl DiagramEmitter for DrawioEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::StructuralDiagram
    }

    fn emit(&self, graph: &CallGraph, layout: &Layout) -> Result<String, EmissionError> {
        let ids = NodeIds::new(graph);
        let page_height = if self.options.legend {
            layout.height + LEGEND_HEIGHT + 20
        } else {
            layout.height
        };

        let mut out = vec![
            r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
            r#"<mxfile host="app.diagrams.net">"#.to_string(),
            r#"  <diagram id="flow" name="Flow">"#.to_string(),
            format!(
                r#"    <mxGraphModel grid="1" gridSize="10" guides="1" arrows="1" connect="1" page="1" pageWidth="{}" pageHeight="{page_height}" math="0" shadow="0">"#,
                layout.width
            ),
            "      <root>".to_string(),
            r#"        <mxCell id="0"/>"#.to_string(),
            r#"        <mxCell id="1" parent="0"/>"#.to_string(),
        ];

        for lane_box in &layout.lanes {
            let Some(lane) = graph.lane(lane_box.lane) else {
                continue;
            };
            let name = xml_escape(FORMAT, &format!("lane `{}`", lane.name), &lane.name)?;
            let r = lane_box.rect;
            out.push(format!(
                r#"        <mxCell id="{}" value="{name}" style="{}" vertex="1" parent="1">"#,
                lane_id(lane_box.lane),
                self.lane_style(lane.kind)
            ));
            out.push(format!(
                r#"          <mxGeometry x="{}" y="{}" width="{}" height="{}" as="geometry"/>"#,
                r.x, r.y, r.w, r.h
            ));
            out.push("        </mxCell>".into());

            for idx in layout.lane_order(graph, lane_box.lane) {
                let node = graph.node(idx);
                let item = format!("node `{}`", node.id);
                let placement = layout.placement(idx).ok_or_else(|| EmissionError::MissingPosition {
                    format: FORMAT,
                    node: node.id.clone(),
                })?;
                let label = xml_escape(FORMAT, &item, &node.label)?;
                let qualified = xml_escape(FORMAT, &item, &node.id)?;
                let style = self.node_style(node, layout.is_entry(idx), placement.weight, layout.size_mode);
                let rect = placement.rect;
                out.push(format!(
                    r#"        <object id="{}" label="{label}" qualified_name="{qualified}" kind="{}" rank="{}" column="{}" weight="{:.2}" params="{}" touches_data="{}">"#,
                    ids.get(idx),
                    node.kind.as_str(),
                    placement.rank,
                    placement.column,
                    placement.weight,
                    node.param_count,
                    node.touches_data
                ));
                out.push(format!(
                    r#"          <mxCell style="{style}" vertex="1" parent="{}">"#,
                    lane_id(lane_box.lane)
                ));
                out.push(format!(
                    r#"            <mxGeometry x="{}" y="{}" width="{}" height="{}" as="geometry"/>"#,
                    rect.x - r.x,
                    rect.y - r.y,
                    rect.w,
                    rect.h
                ));
                out.push("          </mxCell>".into());
                out.push("        </object>".into());
            }
        }

        for edge in graph.graph.edge_references() {
            let weight = edge.weight();
            let source = ids.get(edge.source());
            let target = ids.get(edge.target());
            let item = format!("edge `{source}` -> `{target}`");
            let label = xml_escape(FORMAT, &item, weight.label.as_deref().unwrap_or(""))?;
            let route = layout.route(edge.id());
            let style = self.edge_style(
                weight.kind,
                layout.is_back_edge(edge.id()),
                route.is_some_and(|r| r.jumps),
                layout.edge_style,
            );
            out.push(format!(
                r#"        <object id="e_{}" label="{label}" kind="{}">"#,
                edge.id().index(),
                weight.kind.as_str()
            ));
            out.push(format!(
                r#"          <mxCell style="{style}" edge="1" parent="1" source="{source}" target="{target}">"#
            ));
            let waypoints = route.map(|r| r.waypoints()).unwrap_or(&[]);
            if waypoints.is_empty() {
                out.push(r#"            <mxGeometry relative="1" as="geometry"/>"#.into());
            } else {
                out.push(r#"            <mxGeometry relative="1" as="geometry">"#.into());
                out.push(r#"              <Array as="points">"#.into());
                for p in waypoints {
                    out.push(format!(r#"                <mxPoint x="{}" y="{}"/>"#, p.x, p.y));
                }
                out.push("              </Array>".into());
                out.push("            </mxGeometry>".into());
            }
            out.push("          </mxCell>".into());
            out.push("        </object>".into());
        }

        if self.options.legend {
            self.legend(layout.height, &mut out);
        }

        out.push("      </root>".into());
        out.push("    </mxGraphModel>".into());
        out.push("  </diagram>".into());
        out.push("</mxfile>".into());
        let mut doc = out.join("\n");
        doc.push('\n');
        Ok(doc)
    }
}
