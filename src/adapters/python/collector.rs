use super::imports::ImportMap;
use super::{collapsed_text, node_text};
use crate::domain::entity::{Entity, EntityIndex};
use crate::domain::reference::{DataAccessIndex, ReferenceRecord};
use tracing::debug;
use tree_sitter::Node;

const CONSTRUCTOR: &str = "__init__";

/// Resolves the calls of one module's entities.
pub(super) struct Collector<'a> {
    pub module: &'a str,
    pub source: &'a [u8],
    pub index: &'a EntityIndex,
    pub imports: &'a ImportMap,
    pub markers: &'a [String],
}

struct Scope<'e> {
    entity: &'e Entity,
    /// Tagged callables hand their marker calls over to the data-access tags.
    suppress_markers: bool,
}

impl Collector<'_> {
    /// References of `entity` in source order, preceded by its data-access
    /// records.
    pub fn references(&self, root: Node, entity: &Entity, tags: &DataAccessIndex) -> Vec<ReferenceRecord> {
        let entity_tags = tags.tags_for(&entity.qualified_name);
        let mut out: Vec<ReferenceRecord> = entity_tags
            .iter()
            .map(|tag| ReferenceRecord::data_access(&entity.qualified_name, tag))
            .collect();
        let scope = Scope {
            entity,
            suppress_markers: !entity_tags.is_empty(),
        };

        for span in &entity.spans {
            let Some(node) = root.descendant_for_byte_range(span.start_byte, span.end_byte) else {
                continue;
            };
            let body = if entity.is_entry_hint() {
                Some(node)
            } else {
                match node.kind() {
                    "decorated_definition" => node
                        .child_by_field_name("definition")
                        .and_then(|d| d.child_by_field_name("body")),
                    _ => node.child_by_field_name("body"),
                }
            };
            if let Some(body) = body {
                self.visit(body, &scope, &mut out);
            }
        }
        out
    }

    fn visit(&self, node: Node, scope: &Scope, out: &mut Vec<ReferenceRecord>) {
        match node.kind() {
            // Definitions inside the entry guard are not part of it
            "function_definition" | "class_definition" | "decorated_definition"
                if scope.entity.is_entry_hint() =>
            {
                return;
            }
            "call" => self.call(node, scope, out),
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, scope, out);
        }
    }

    fn call(&self, node: Node, scope: &Scope, out: &mut Vec<ReferenceRecord>) {
        if let Some(callee) = node.child_by_field_name("function") {
            if scope.suppress_markers && self.is_marker(callee) {
                debug!(entity = %scope.entity.qualified_name, "marker call replaced by data-access tags");
            } else {
                out.push(self.reference(callee, scope.entity, None));
            }
        }

        // Event callbacks passed as `on_*=handler`
        let Some(arguments) = node.child_by_field_name("arguments") else {
            return;
        };
        let mut cursor = arguments.walk();
        for argument in arguments.named_children(&mut cursor) {
            if argument.kind() != "keyword_argument" {
                continue;
            }
            let (Some(name), Some(value)) = (
                argument.child_by_field_name("name"),
                argument.child_by_field_name("value"),
            ) else {
                continue;
            };
            let name = node_text(name, self.source);
            if name.starts_with("on_") && matches!(value.kind(), "identifier" | "attribute") {
                out.push(self.reference(value, scope.entity, Some(name)));
            }
        }
    }

    fn is_marker(&self, callee: Node) -> bool {
        callee.kind() == "attribute"
            && callee
                .child_by_field_name("attribute")
                .map(|a| node_text(a, self.source))
                .is_some_and(|method| self.markers.iter().any(|m| *m == method))
    }

    fn reference(&self, callee: Node, entity: &Entity, label: Option<String>) -> ReferenceRecord {
        let symbol = collapsed_text(callee, self.source);
        let label = label.unwrap_or_else(|| match callee.kind() {
            "attribute" => callee
                .child_by_field_name("attribute")
                .map(|a| node_text(a, self.source))
                .unwrap_or_else(|| symbol.clone()),
            _ => symbol.clone(),
        });
        match self.resolve(callee, entity) {
            Some(target) => ReferenceRecord::internal(&entity.qualified_name, symbol, target, Some(label)),
            None => ReferenceRecord::external(&entity.qualified_name, symbol, Some(label)),
        }
    }

    fn resolve(&self, callee: Node, entity: &Entity) -> Option<String> {
        match callee.kind() {
            "identifier" => self.resolve_name(&node_text(callee, self.source)),
            "attribute" => {
                let object = collapsed_text(callee.child_by_field_name("object")?, self.source);
                let attribute = node_text(callee.child_by_field_name("attribute")?, self.source);
                self.resolve_member(&object, &attribute, entity)
            }
            _ => None,
        }
    }

    /// Same-module function, imported function or class, then a local class
    /// constructor.
    fn resolve_name(&self, name: &str) -> Option<String> {
        if let Some(q) = self.index.function(self.module, name) {
            return Some(q.to_string());
        }
        if let Some((module, imported)) = self.imports.symbol(name) {
            let module = self.module_path(module);
            let target = self
                .index
                .function(&module, imported)
                .or_else(|| self.index.method(&module, imported, CONSTRUCTOR));
            if let Some(q) = target {
                return Some(q.to_string());
            }
        }
        self.index
            .method(self.module, name, CONSTRUCTOR)
            .map(str::to_string)
    }

    fn resolve_member(&self, object: &str, attribute: &str, entity: &Entity) -> Option<String> {
        if matches!(object, "self" | "cls") {
            let method = entity
                .class_path()
                .and_then(|class| self.index.method(self.module, class, attribute));
            return method
                .or_else(|| self.index.function(self.module, attribute))
                .map(str::to_string);
        }
        if let Some(module) = self.imports.module(object) {
            return self.module_member(&self.module_path(module), attribute);
        }
        if let Some((module, imported)) = self.imports.symbol(object) {
            let module = self.module_path(module);
            let submodule = format!("{module}.{imported}");
            if self.index.has_module(&submodule) {
                return self.module_member(&submodule, attribute);
            }
            return self
                .index
                .method(&module, imported, attribute)
                .map(str::to_string);
        }
        if self.index.has_class(self.module, object) {
            return self
                .index
                .method(self.module, object, attribute)
                .map(str::to_string);
        }
        None
    }

    fn module_member(&self, module: &str, attribute: &str) -> Option<String> {
        self.index
            .function(module, attribute)
            .or_else(|| self.index.method(module, attribute, CONSTRUCTOR))
            .map(str::to_string)
    }

    /// Import paths are tried as written, then as a sibling of this module.
    fn module_path(&self, module: &str) -> String {
        if self.index.has_module(module) {
            return module.to_string();
        }
        if let Some((package, _)) = self.module.rsplit_once('.') {
            let sibling = format!("{package}.{module}");
            if self.index.has_module(&sibling) {
                return sibling;
            }
        }
        module.to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::adapters::python::PythonAnalyzer;
    use crate::domain::entity::{Entity, EntityIndex, SourceUnit};
    use crate::domain::ports::{EdgeCollector, EntityExtractor};
    use crate::domain::reference::{DataAccessIndex, DataAccessTag, ReferenceKind, ReferenceRecord};

    fn collect(units: &[(&str, &str)], tags: Vec<DataAccessTag>) -> Vec<ReferenceRecord> {
        let analyzer = PythonAnalyzer::new();
        let units: Vec<_> = units.iter().map(|(p, t)| SourceUnit::new(*p, *t)).collect();
        let per_unit: Vec<Vec<Entity>> = units.iter().map(|u| analyzer.extract(u).unwrap()).collect();
        let index = EntityIndex::new(per_unit.iter().flatten());
        let tags = DataAccessIndex::new(tags);
        units
            .iter()
            .zip(&per_unit)
            .flat_map(|(u, e)| analyzer.collect(u, e, &index, &tags).unwrap())
            .collect()
    }

    fn summary(refs: &[ReferenceRecord]) -> Vec<(String, String, ReferenceKind)> {
        refs.iter()
            .map(|r| (r.source.clone(), r.target.clone(), r.kind))
            .collect()
    }

    #[test]
    fn test_bare_calls_resolve_locally_then_externally() {
        let src = "def f():\n    g()\n\ndef g():\n    lib.x()\n";
        let refs = collect(&[("m.py", src)], vec![]);
        assert_eq!(
            summary(&refs),
            vec![
                ("m.f".into(), "m.g".into(), ReferenceKind::CallInternal),
                ("m.g".into(), "lib.x".into(), ReferenceKind::CallExternal),
            ]
        );
        assert_eq!(refs[0].label.as_deref(), Some("g"));
        assert_eq!(refs[1].label.as_deref(), Some("x"));
    }

    #[test]
    fn test_self_calls_and_constructors() {
        let src = r#"
class Cart:
    def __init__(self):
        self.reset()

    def reset(self):
        self.items.clear()

def build():
    return Cart()
"#;
        let refs = collect(&[("shop.py", src)], vec![]);
        assert_eq!(
            summary(&refs),
            vec![
                ("shop.Cart.__init__".into(), "shop.Cart.reset".into(), ReferenceKind::CallInternal),
                ("shop.Cart.reset".into(), "self.items.clear".into(), ReferenceKind::CallExternal),
                ("shop.build".into(), "shop.Cart.__init__".into(), ReferenceKind::CallInternal),
            ]
        );
    }

    #[test]
    fn test_cross_module_imports() {
        let util = "def helper():\n    pass\n";
        let app = "import util\nfrom util import helper as h\n\ndef run():\n    util.helper()\n    h()\n";
        let refs = collect(&[("pkg/util.py", util), ("pkg/app.py", app)], vec![]);
        let targets: Vec<_> = refs.iter().map(|r| (r.target.as_str(), r.kind)).collect();
        assert_eq!(
            targets,
            vec![
                ("pkg.util.helper", ReferenceKind::CallInternal),
                ("pkg.util.helper", ReferenceKind::CallInternal),
            ]
        );
    }

    #[test]
    fn test_event_keyword_arguments() {
        let src = r#"
class Screen:
    def build(self):
        Button(text="Go", on_release=self.go)

    def go(self):
        pass
"#;
        let refs = collect(&[("ui.py", src)], vec![]);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].target, "Button");
        assert_eq!(refs[0].kind, ReferenceKind::CallExternal);
        assert_eq!(refs[1].target, "ui.Screen.go");
        assert_eq!(refs[1].label.as_deref(), Some("on_release"));
    }

    #[test]
    fn test_tagged_marker_calls_become_data_access() {
        let src = "def load(cur):\n    cur.execute(SQL)\n    log()\n\ndef other(cur):\n    cur.execute(SQL)\n";
        let refs = collect(
            &[("repo.py", src)],
            vec![
                DataAccessTag::new("repo.load", "select", "orders"),
                DataAccessTag::new("repo.load", "update", "orders"),
            ],
        );
        assert_eq!(
            summary(&refs),
            vec![
                ("repo.load".into(), "orders".into(), ReferenceKind::DataAccess),
                ("repo.load".into(), "orders".into(), ReferenceKind::DataAccess),
                ("repo.load".into(), "log".into(), ReferenceKind::CallExternal),
                ("repo.other".into(), "cur.execute".into(), ReferenceKind::CallExternal),
            ]
        );
        assert_eq!(refs[0].label.as_deref(), Some("SELECT"));
        assert_eq!(refs[1].label.as_deref(), Some("UPDATE"));
    }

    #[test]
    fn test_entry_guard_collects_calls_but_skips_nested_definitions() {
        let src = "def run():\n    pass\n\nif __name__ == \"__main__\":\n    def local():\n        hidden()\n    run()\n";
        let refs = collect(&[("app.py", src)], vec![]);
        assert_eq!(
            summary(&refs),
            vec![("app.__main__".into(), "app.run".into(), ReferenceKind::CallInternal)]
        );
    }

    #[test]
    fn test_nested_function_calls_belong_to_enclosing_entity() {
        let src = "def outer():\n    def inner():\n        print('x')\n    inner()\n";
        let refs = collect(&[("m.py", src)], vec![]);
        let targets: Vec<_> = refs.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["print", "inner"]);
    }
}
