use crate::grammar::text;
use crate::types::Declaration;
use std::collections::{BTreeSet, HashSet};
use tree_sitter::Node;

const REFERENCE_KINDS: &[&str] = &[
    "identifier",
    "type_identifier",
    "field_identifier",
    "property_identifier",
    "shorthand_property_identifier",
];

/// Every identifier-like name used inside `node`
pub(crate) fn collect(node: Node, source: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    visit(node, source, &mut names);
    names
}

fn visit(node: Node, source: &str, names: &mut BTreeSet<String>) {
    if REFERENCE_KINDS.contains(&node.kind()) {
        if let Some(name) = text(node, source) {
            names.insert(name.to_string());
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, source, names);
    }
}

/// Narrow raw references (stored in `dependencies` while the tree is built) to names that
/// resolve to declarations of the file or to imports.
///
/// A declaration never depends on itself or on anything it contains.
pub(crate) fn resolve(
    declarations: &mut [Declaration],
    imported_names: &BTreeSet<String>,
    max_references: usize,
) {
    let mut known: HashSet<String> = imported_names.iter().cloned().collect();
    for declaration in declarations.iter() {
        known.extend(declaration.iter().map(|d| d.name.clone()));
    }

    for declaration in declarations.iter_mut() {
        resolve_one(declaration, &known, max_references);
    }
}

fn resolve_one(declaration: &mut Declaration, known: &HashSet<String>, max_references: usize) {
    let own: HashSet<String> = declaration.iter().map(|d| d.name.clone()).collect();
    let resolved: BTreeSet<String> = declaration
        .dependencies
        .iter()
        .filter(|name| known.contains(*name) && !own.contains(*name))
        .take(max_references)
        .cloned()
        .collect();
    declaration.dependencies = resolved;

    for child in &mut declaration.children {
        resolve_one(child, known, max_references);
    }
}
