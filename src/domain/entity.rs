use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One analyzed source unit: a module-qualified path plus its raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: String,
    pub text: String,
}

impl SourceUnit {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Module name derived from the path: extension dropped, separators
    /// replaced by dots (`pkg/util.py` → `pkg.util`).
    pub fn module_name(&self) -> String {
        module_name_for(&self.path)
    }
}

pub fn module_name_for(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let trimmed = normalized
        .strip_suffix(".py")
        .or_else(|| normalized.strip_suffix(".pyw"))
        .unwrap_or(&normalized);
    trimmed
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect::<Vec<_>>()
        .join(".")
}

/// Byte range of one declaration inside its source unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    pub start_byte: usize,
    pub end_byte: usize,
    /// 1-based line of the declaration.
    pub line: usize,
}

/// Where an entity was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum EntityScope {
    /// Module-level function.
    Module,
    /// Method of a (possibly nested) class; holds the dotted class path.
    Class(String),
    /// Synthetic entity for a module's `if __name__ == "__main__":` block.
    EntryGuard,
}

/// An extracted callable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// `module.name` or `module.Class.method`; unique within the run.
    pub qualified_name: String,
    pub module: String,
    /// Unit name without module or class prefix.
    pub name: String,
    pub scope: EntityScope,
    /// Declared parameters, display only.
    pub param_count: usize,
    /// Every declaration that shares this qualified name, first one first.
    pub spans: Vec<SourceSpan>,
}

impl Entity {
    pub fn class_path(&self) -> Option<&str> {
        match &self.scope {
            EntityScope::Class(path) => Some(path.as_str()),
            _ => None,
        }
    }

    pub fn is_entry_hint(&self) -> bool {
        matches!(self.scope, EntityScope::EntryGuard)
    }

    /// Label shown on diagrams: `name()` or `Class.name()`.
    pub fn display_label(&self) -> String {
        match &self.scope {
            EntityScope::Class(class) => format!("{class}.{}()", self.name),
            EntityScope::Module => format!("{}()", self.name),
            EntityScope::EntryGuard => self.name.clone(),
        }
    }

    pub fn line(&self) -> usize {
        self.spans.first().map(|s| s.line).unwrap_or(0)
    }
}

/// Run-wide lookup table over every extracted entity, used to resolve call
/// targets by module, class and name.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    qualified: HashSet<String>,
    modules: HashSet<String>,
    functions: HashMap<(String, String), String>,
    methods: HashMap<(String, String, String), String>,
    classes: HashSet<(String, String)>,
}

impl EntityIndex {
    pub fn new<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        let mut index = Self::default();
        for entity in entities {
            index.insert(entity);
        }
        index
    }

    pub fn insert(&mut self, entity: &Entity) {
        self.qualified.insert(entity.qualified_name.clone());
        self.modules.insert(entity.module.clone());
        match &entity.scope {
            EntityScope::Module => {
                self.functions
                    .entry((entity.module.clone(), entity.name.clone()))
                    .or_insert_with(|| entity.qualified_name.clone());
            }
            EntityScope::Class(class) => {
                self.classes.insert((entity.module.clone(), class.clone()));
                self.methods
                    .entry((entity.module.clone(), class.clone(), entity.name.clone()))
                    .or_insert_with(|| entity.qualified_name.clone());
            }
            EntityScope::EntryGuard => {}
        }
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.qualified.contains(qualified_name)
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    pub fn has_class(&self, module: &str, class: &str) -> bool {
        self.classes.contains(&(module.to_string(), class.to_string()))
    }

    pub fn function(&self, module: &str, name: &str) -> Option<&str> {
        self.functions
            .get(&(module.to_string(), name.to_string()))
            .map(String::as_str)
    }

    pub fn method(&self, module: &str, class: &str, name: &str) -> Option<&str> {
        self.methods
            .get(&(module.to_string(), class.to_string(), name.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.qualified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qualified.is_empty()
    }
}
