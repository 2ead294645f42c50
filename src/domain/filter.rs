//! Scope filter applied between extraction and assembly.

use crate::domain::entity::{Entity, EntityScope};
use crate::domain::ports::TestDetector;
use crate::domain::reference::{ReferenceKind, ReferenceRecord};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeFilter {
    /// When non-empty, only these modules are kept.
    pub include_modules: Vec<String>,
    pub exclude_modules: Vec<String>,
    /// Drop entities whose unit name starts with `_` (entry guards stay).
    pub hide_private: bool,
    pub exclude_tests: bool,
    /// Drop call-internal references that stay inside one module.
    pub inter_module_only: bool,
}

impl ScopeFilter {
    pub fn is_noop(&self) -> bool {
        self == &Self::default()
    }

    /// `path` is the source path the entity was extracted from.
    pub fn keep_entity(&self, entity: &Entity, path: &str, detector: &dyn TestDetector) -> bool {
        if !self.include_modules.is_empty() && !self.include_modules.contains(&entity.module) {
            return false;
        }
        if self.exclude_modules.contains(&entity.module) {
            return false;
        }
        if self.hide_private && !entity.is_entry_hint() && entity.name.starts_with('_') {
            return false;
        }
        if self.exclude_tests {
            let symbol = match &entity.scope {
                EntityScope::Class(class) => format!("{class}.{}", entity.name),
                _ => entity.name.clone(),
            };
            if detector.is_test_code(&symbol, path) {
                return false;
            }
        }
        true
    }

    /// Keeps entities that pass [`ScopeFilter::keep_entity`]; `paths` maps
    /// each module to its source path.
    pub fn retain_entities(
        &self,
        entities: Vec<Entity>,
        paths: &HashMap<String, String>,
        detector: &dyn TestDetector,
    ) -> Vec<Entity> {
        if self.is_noop() {
            return entities;
        }
        entities
            .into_iter()
            .filter(|entity| {
                let path = paths.get(&entity.module).map(String::as_str).unwrap_or("");
                let keep = self.keep_entity(entity, path, detector);
                if !keep {
                    debug!(entity = %entity.qualified_name, "filtered out of scope");
                }
                keep
            })
            .collect()
    }

    /// Drops references whose source was filtered, and same-module internal
    /// calls when `inter_module_only` is set. References to filtered targets
    /// are left for the assembler to downgrade.
    pub fn retain_references(
        &self,
        references: Vec<ReferenceRecord>,
        kept: &[Entity],
    ) -> Vec<ReferenceRecord> {
        let sources: HashSet<&str> = kept.iter().map(|e| e.qualified_name.as_str()).collect();
        let modules: HashMap<&str, &str> = kept
            .iter()
            .map(|e| (e.qualified_name.as_str(), e.module.as_str()))
            .collect();

        references
            .into_iter()
            .filter(|r| sources.contains(r.source.as_str()))
            .filter(|r| {
                if !self.inter_module_only || r.kind != ReferenceKind::CallInternal {
                    return true;
                }
                modules.get(r.source.as_str()) != modules.get(r.target.as_str())
            })
            .collect()
    }
}
