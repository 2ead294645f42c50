//! Edge paths and line-jump detection.
//!
//! Paths run between node centres. Orthogonal paths bend twice through the
//! vertical midpoint; direct paths are a single segment. Crossing detection
//! only considers proper intersections, so paths that merely touch at an end
//! or run collinear are never flagged.

use crate::domain::config::EdgeStyle;
use crate::domain::graph::CallGraph;
use petgraph::visit::EdgeRef;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }
}

/// Rendered path of one edge plus its line-jump hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRoute {
    /// Source centre, bend points, target centre.
    pub points: Vec<Point>,
    /// Drawn with a gap where it crosses an earlier edge.
    pub jumps: bool,
}

impl EdgeRoute {
    pub fn new(source: &Rect, target: &Rect, style: EdgeStyle) -> Self {
        let s = source.center();
        let t = target.center();
        let mut points = match style {
            EdgeStyle::Direct => vec![s, t],
            EdgeStyle::Orthogonal if s.x == t.x => vec![s, t],
            EdgeStyle::Orthogonal => {
                let my = (s.y + t.y) / 2;
                vec![s, Point::new(s.x, my), Point::new(t.x, my), t]
            }
        };
        points.dedup();
        Self { points, jumps: false }
    }

    /// Bend points only, without the two endpoints.
    pub fn waypoints(&self) -> &[Point] {
        if self.points.len() <= 2 {
            &[]
        } else {
            &self.points[1..self.points.len() - 1]
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn crosses(&self, other: &EdgeRoute) -> bool {
        self.segments()
            .any(|(a1, a2)| other.segments().any(|(b1, b2)| segments_cross(a1, a2, b1, b2)))
    }
}

/// Routes every non-self-loop edge of `graph`. `rects` is indexed by node
/// index; the result is indexed by edge index.
pub fn route_edges(
    graph: &CallGraph,
    rects: &[Rect],
    style: EdgeStyle,
    line_jumps: bool,
) -> Vec<Option<EdgeRoute>> {
    let mut routes: Vec<Option<EdgeRoute>> = graph
        .graph
        .edge_references()
        .map(|e| {
            if e.source() == e.target() {
                return None;
            }
            let source = rects.get(e.source().index())?;
            let target = rects.get(e.target().index())?;
            Some(EdgeRoute::new(source, target, style))
        })
        .collect();

    if line_jumps {
        mark_line_jumps(graph, &mut routes);
    }
    routes
}

/// Flags the later edge of every properly crossing pair. Pairs sharing an
/// endpoint node never count as crossing.
fn mark_line_jumps(graph: &CallGraph, routes: &mut [Option<EdgeRoute>]) {
    let ends: Vec<_> = graph
        .graph
        .edge_references()
        .map(|e| (e.source(), e.target()))
        .collect();

    for j in 0..routes.len() {
        let Some(later) = routes[j].as_ref() else {
            continue;
        };
        let (js, jt) = ends[j];
        let crossed = (0..j).any(|i| {
            let (is, it) = ends[i];
            if is == js || is == jt || it == js || it == jt {
                return false;
            }
            routes[i].as_ref().is_some_and(|earlier| earlier.crosses(later))
        });
        if crossed && let Some(route) = routes[j].as_mut() {
            route.jumps = true;
        }
    }
}

fn orientation(a: Point, b: Point, c: Point) -> i64 {
    let v = (b.x as i64 - a.x as i64) * (c.y as i64 - a.y as i64)
        - (b.y as i64 - a.y as i64) * (c.x as i64 - a.x as i64);
    v.signum()
}

/// Proper intersection: the segments cross at a single interior point.
pub fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let o1 = orientation(a1, a2, b1);
    let o2 = orientation(a1, a2, b2);
    let o3 = orientation(b1, b2, a1);
    let o4 = orientation(b1, b2, a2);
    o1 * o2 < 0 && o3 * o4 < 0
}
