use crate::domain::reference::ReferenceKind;
use serde::Serialize;

/// Edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    // ============ Control Flow ============
    CallInternal, // Function → Function
    CallExternal, // Function → External symbol

    // ============ Data Flow ============
    DataAccess, // Function → Data resource, labelled with the operation
}

impl EdgeKind {
    /// Call kinds drive ranking and the degree-based size heuristic.
    pub fn is_call(&self) -> bool {
        matches!(self, EdgeKind::CallInternal | EdgeKind::CallExternal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::CallInternal => "call_internal",
            EdgeKind::CallExternal => "call_external",
            EdgeKind::DataAccess => "data_access",
        }
    }
}

impl From<ReferenceKind> for EdgeKind {
    fn from(kind: ReferenceKind) -> Self {
        match kind {
            ReferenceKind::CallInternal => EdgeKind::CallInternal,
            ReferenceKind::CallExternal => EdgeKind::CallExternal,
            ReferenceKind::DataAccess => EdgeKind::DataAccess,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub kind: EdgeKind,
    pub label: Option<String>,
}

impl Edge {
    pub fn new(kind: EdgeKind, label: Option<String>) -> Self {
        Self { kind, label }
    }
}
