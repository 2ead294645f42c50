use super::node_text;
use std::collections::HashMap;
use tree_sitter::Node;

/// Names bound by the import statements of one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    /// Local name → module path (`import a.b as x` binds `x` → `a.b`).
    modules: HashMap<String, String>,
    /// Local name → (module path, imported name) for `from m import n [as local]`.
    symbols: HashMap<String, (String, String)>,
}

impl ImportMap {
    /// Collects every import statement in the tree, nested ones included.
    pub fn collect(root: Node, source: &[u8]) -> Self {
        let mut map = Self::default();
        map.visit(root, source);
        map
    }

    fn visit(&mut self, node: Node, source: &[u8]) {
        match node.kind() {
            "import_statement" => self.import_statement(node, source),
            "import_from_statement" => self.import_from_statement(node, source),
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit(child, source);
                }
            }
        }
    }

    fn import_statement(&mut self, node: Node, source: &[u8]) {
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            match name.kind() {
                "dotted_name" => {
                    let path = node_text(name, source);
                    if let Some(head) = path.split('.').next() {
                        self.modules.insert(head.to_string(), head.to_string());
                    }
                    self.modules.insert(path.clone(), path);
                }
                "aliased_import" => {
                    if let (Some(path), Some(alias)) =
                        (name.child_by_field_name("name"), name.child_by_field_name("alias"))
                    {
                        self.modules
                            .insert(node_text(alias, source), node_text(path, source));
                    }
                }
                _ => {}
            }
        }
    }

    fn import_from_statement(&mut self, node: Node, source: &[u8]) {
        let module = node
            .child_by_field_name("module_name")
            .map(|m| node_text(m, source))
            .unwrap_or_default();
        let module = module.trim_start_matches('.').to_string();

        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let (imported, local) = match name.kind() {
                "dotted_name" => {
                    let imported = node_text(name, source);
                    (imported.clone(), imported)
                }
                "aliased_import" => match (
                    name.child_by_field_name("name"),
                    name.child_by_field_name("alias"),
                ) {
                    (Some(n), Some(a)) => (node_text(n, source), node_text(a, source)),
                    _ => continue,
                },
                _ => continue,
            };
            if module.is_empty() {
                // `from . import util` binds a sibling module
                self.modules.insert(local, imported);
            } else {
                self.symbols.insert(local, (module.clone(), imported));
            }
        }
    }

    pub fn module(&self, local: &str) -> Option<&str> {
        self.modules.get(local).map(String::as_str)
    }

    pub fn symbol(&self, local: &str) -> Option<(&str, &str)> {
        self.symbols
            .get(local)
            .map(|(module, name)| (module.as_str(), name.as_str()))
    }
}
