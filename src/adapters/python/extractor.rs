use super::node_text;
use crate::domain::entity::{Entity, EntityScope, SourceSpan};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tree_sitter::Node;

/// Matches a whitespace-free `__name__ == "__main__"` condition, either way round.
fn main_guard_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(__name__==['"]__main__['"]|['"]__main__['"]==__name__)$"#)
            .expect("main guard regex")
    })
}

/// Statements whose nested blocks still belong to the enclosing scope.
const TRANSPARENT: &[&str] = &[
    "if_statement",
    "elif_clause",
    "else_clause",
    "try_statement",
    "except_clause",
    "except_group_clause",
    "finally_clause",
    "with_statement",
    "for_statement",
    "while_statement",
    "block",
];

pub const ENTRY_GUARD_NAME: &str = "__main__";

struct Extraction<'a> {
    module: &'a str,
    source: &'a [u8],
    entities: Vec<Entity>,
    by_name: HashMap<String, usize>,
}

/// Module-level functions, class methods and the entry guard, in declaration
/// order. Redefinitions merge into the first declaration.
pub fn extract_entities(root: Node, source: &[u8], module: &str) -> Vec<Entity> {
    let mut ex = Extraction {
        module,
        source,
        entities: Vec::new(),
        by_name: HashMap::new(),
    };
    ex.walk(root, None);
    ex.entities
}

impl Extraction<'_> {
    fn walk(&mut self, node: Node, class: Option<&str>) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.statement(child, child, class);
        }
    }

    /// `outer` is the node whose range the entity spans (the decorated
    /// definition when there is one).
    fn statement(&mut self, node: Node, outer: Node, class: Option<&str>) {
        match node.kind() {
            "function_definition" => self.function(node, outer, class),
            "class_definition" => {
                let Some(name) = node.child_by_field_name("name") else {
                    return;
                };
                let name = node_text(name, self.source);
                let path = match class {
                    Some(parent) => format!("{parent}.{name}"),
                    None => name,
                };
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk(body, Some(&path));
                }
            }
            "decorated_definition" => {
                if let Some(definition) = node.child_by_field_name("definition") {
                    self.statement(definition, node, class);
                }
            }
            "if_statement" if class.is_none() && self.is_main_guard(node) => {
                if let Some(body) = node.child_by_field_name("consequence") {
                    self.add(
                        ENTRY_GUARD_NAME.to_string(),
                        EntityScope::EntryGuard,
                        0,
                        span(body),
                    );
                }
            }
            kind if TRANSPARENT.contains(&kind) => self.walk(node, class),
            _ => {}
        }
    }

    fn function(&mut self, node: Node, outer: Node, class: Option<&str>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name, self.source);
        let params = node
            .child_by_field_name("parameters")
            .map(param_count)
            .unwrap_or(0);
        let scope = match class {
            Some(class) => EntityScope::Class(class.to_string()),
            None => EntityScope::Module,
        };
        self.add(name, scope, params, span(outer));
    }

    fn add(&mut self, name: String, scope: EntityScope, param_count: usize, span: SourceSpan) {
        let qualified_name = match &scope {
            EntityScope::Class(class) => format!("{}.{class}.{name}", self.module),
            _ => format!("{}.{name}", self.module),
        };
        if let Some(&i) = self.by_name.get(&qualified_name) {
            self.entities[i].spans.push(span);
            return;
        }
        self.by_name.insert(qualified_name.clone(), self.entities.len());
        self.entities.push(Entity {
            qualified_name,
            module: self.module.to_string(),
            name,
            scope,
            param_count,
            spans: vec![span],
        });
    }

    fn is_main_guard(&self, node: Node) -> bool {
        node.child_by_field_name("condition")
            .map(|c| super::collapsed_text(c, self.source))
            .is_some_and(|text| main_guard_regex().is_match(&text))
    }
}

fn span(node: Node) -> SourceSpan {
    SourceSpan {
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        line: node.start_position().row + 1,
    }
}

/// Declared parameters, without the bare `*` and `/` separators.
fn param_count(parameters: Node) -> usize {
    let mut cursor = parameters.walk();
    parameters
        .named_children(&mut cursor)
        .filter(|p| !matches!(p.kind(), "keyword_separator" | "positional_separator" | "comment"))
        .count()
}
