use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classification of an outbound reference, as decided by the Edge Collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Target is another extracted entity of this run.
    CallInternal,
    /// Target is a library, builtin, or otherwise unresolved symbol.
    CallExternal,
    /// Target is a named data resource; the label carries the operation tag.
    DataAccess,
}

/// One outbound reference from a callable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReferenceRecord {
    /// Qualified name of the referencing entity.
    pub source: String,
    /// Referenced symbol's textual name, exactly as written.
    pub symbol: String,
    /// Resolved target: entity qualified name, verbatim external name, or
    /// resource name depending on `kind`.
    pub target: String,
    pub kind: ReferenceKind,
    pub label: Option<String>,
}

impl ReferenceRecord {
    pub fn internal(
        source: impl Into<String>,
        symbol: impl Into<String>,
        target: impl Into<String>,
        label: Option<String>,
    ) -> Self {
        Self {
            source: source.into(),
            symbol: symbol.into(),
            target: target.into(),
            kind: ReferenceKind::CallInternal,
            label,
        }
    }

    pub fn external(source: impl Into<String>, symbol: impl Into<String>, label: Option<String>) -> Self {
        let symbol = symbol.into();
        Self {
            source: source.into(),
            target: symbol.clone(),
            symbol,
            kind: ReferenceKind::CallExternal,
            label,
        }
    }

    pub fn data_access(source: impl Into<String>, tag: &DataAccessTag) -> Self {
        Self {
            source: source.into(),
            symbol: tag.resource.clone(),
            target: tag.resource.clone(),
            kind: ReferenceKind::DataAccess,
            label: Some(tag.operation.trim().to_uppercase()),
        }
    }
}

/// Pre-tagged data-access record supplied by the upstream SQL/data tagging
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataAccessTag {
    /// Qualified name of the originating callable.
    pub callable: String,
    /// Operation tag, e.g. `SELECT`, `INSERT`, `DELETE`.
    pub operation: String,
    /// Resource name, e.g. a table or database file.
    pub resource: String,
}

impl DataAccessTag {
    pub fn new(
        callable: impl Into<String>,
        operation: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            callable: callable.into(),
            operation: operation.into(),
            resource: resource.into(),
        }
    }
}

/// Data-access tags grouped by originating callable, keeping input order
/// within each callable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataAccessIndex {
    by_callable: BTreeMap<String, Vec<DataAccessTag>>,
}

impl DataAccessIndex {
    pub fn new(tags: impl IntoIterator<Item = DataAccessTag>) -> Self {
        let mut by_callable: BTreeMap<String, Vec<DataAccessTag>> = BTreeMap::new();
        for tag in tags {
            by_callable.entry(tag.callable.clone()).or_default().push(tag);
        }
        Self { by_callable }
    }

    pub fn tags_for(&self, callable: &str) -> &[DataAccessTag] {
        self.by_callable.get(callable).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn callables(&self) -> impl Iterator<Item = &str> {
        self.by_callable.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_callable.is_empty()
    }
}
