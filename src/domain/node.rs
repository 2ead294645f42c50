use serde::Serialize;

/// Index of a lane in `CallGraph::lanes`.
pub type LaneId = usize;

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    InternalFunction, // Extracted entity
    ExternalSymbol,   // Library, builtin or unresolved callee, keyed by verbatim name
    DataResource,     // Table or database touched by a data-access edge
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::InternalFunction => "internal_function",
            NodeKind::ExternalSymbol => "external_symbol",
            NodeKind::DataResource => "data_resource",
        }
    }
}

/// A graph node. Immutable once the assembler has finished, apart from the
/// `touches_data` flag which the assembler sets while wiring data-access edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Qualified name for entities, verbatim name for external symbols,
    /// resource name for data resources.
    pub id: String,
    pub kind: NodeKind,
    /// Declaring module; empty for synthesized and resource nodes.
    pub module: String,
    pub label: String,
    pub lane: LaneId,
    pub touches_data: bool,
    pub is_entry_hint: bool,
    pub param_count: usize,
}

impl Node {
    pub fn internal(
        id: impl Into<String>,
        module: impl Into<String>,
        label: impl Into<String>,
        lane: LaneId,
    ) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::InternalFunction,
            module: module.into(),
            label: label.into(),
            lane,
            touches_data: false,
            is_entry_hint: false,
            param_count: 0,
        }
    }

    pub fn external(name: impl Into<String>, lane: LaneId) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            id: name,
            kind: NodeKind::ExternalSymbol,
            module: String::new(),
            lane,
            touches_data: false,
            is_entry_hint: false,
            param_count: 0,
        }
    }

    pub fn resource(name: impl Into<String>, lane: LaneId) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            id: name,
            kind: NodeKind::DataResource,
            module: String::new(),
            lane,
            touches_data: true,
            is_entry_hint: false,
            param_count: 0,
        }
    }

    pub fn is_resource(&self) -> bool {
        self.kind == NodeKind::DataResource
    }
}
