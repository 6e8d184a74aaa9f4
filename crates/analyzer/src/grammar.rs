//! Per-language node tables for the tree-sitter grammars.

use crate::language::Language;
use crate::types::{DeclarationKind, Modifier};
use std::collections::BTreeSet;
use tree_sitter::Node;

pub(crate) const ANONYMOUS: &str = "<anonymous>";

pub(crate) fn text<'s>(node: Node, source: &'s str) -> Option<&'s str> {
    node.utf8_text(source.as_bytes()).ok()
}

/// Field holding the wrapped declaration for transparent wrapper nodes
pub(crate) fn wrapper_field(language: Language, kind: &str) -> Option<&'static str> {
    match (language, kind) {
        (Language::Python, "decorated_definition") => Some("definition"),
        (lang, "export_statement") if lang.is_ecmascript() => Some("declaration"),
        _ => None,
    }
}

/// Modifiers contributed by a wrapper node
pub(crate) fn wrapper_modifiers(language: Language, node: Node, source: &str) -> BTreeSet<Modifier> {
    let mut modifiers = BTreeSet::new();
    match node.kind() {
        "export_statement" => {
            modifiers.insert(Modifier::Exported);
        }
        "decorated_definition" if language == Language::Python => {
            let mut cursor = node.walk();
            for decorator in node
                .named_children(&mut cursor)
                .filter(|child| child.kind() == "decorator")
            {
                let Some(decorator) = text(decorator, source) else {
                    continue;
                };
                if decorator.contains("staticmethod") || decorator.contains("classmethod") {
                    modifiers.insert(Modifier::Static);
                }
                if decorator.contains("abstractmethod") {
                    modifiers.insert(Modifier::Abstract);
                }
            }
        }
        _ => {}
    }
    modifiers
}

/// Declaration kind of `node`, if the language promotes it to a declaration.
///
/// Variable-like declarations only count at module level.
pub(crate) fn declaration_kind(
    language: Language,
    node: Node,
    source: &str,
    top_level: bool,
) -> Option<DeclarationKind> {
    match language {
        Language::Rust => rust_kind(node.kind()),
        Language::Python => python_kind(node, source, top_level),
        lang if lang.is_ecmascript() => ecmascript_kind(node, top_level),
        _ => None,
    }
}

fn rust_kind(kind: &str) -> Option<DeclarationKind> {
    match kind {
        "function_item" | "function_signature_item" => Some(DeclarationKind::Function),
        "struct_item" | "union_item" => Some(DeclarationKind::Struct),
        "enum_item" => Some(DeclarationKind::Enum),
        "trait_item" => Some(DeclarationKind::Interface),
        "impl_item" => Some(DeclarationKind::Impl),
        "mod_item" => Some(DeclarationKind::Module),
        "type_item" => Some(DeclarationKind::TypeAlias),
        "const_item" => Some(DeclarationKind::Constant),
        "static_item" => Some(DeclarationKind::Variable),
        _ => None,
    }
}

fn python_kind(node: Node, source: &str, top_level: bool) -> Option<DeclarationKind> {
    match node.kind() {
        "function_definition" => Some(DeclarationKind::Function),
        "class_definition" => Some(DeclarationKind::Class),
        "expression_statement" if top_level => {
            let name = python_assignment_target(node, source)?;
            if name.chars().any(char::is_alphabetic)
                && !name.chars().any(char::is_lowercase)
            {
                Some(DeclarationKind::Constant)
            } else {
                Some(DeclarationKind::Variable)
            }
        }
        _ => None,
    }
}

fn ecmascript_kind(node: Node, top_level: bool) -> Option<DeclarationKind> {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            Some(DeclarationKind::Function)
        }
        "class_declaration" | "abstract_class_declaration" => Some(DeclarationKind::Class),
        "method_definition" | "method_signature" | "abstract_method_signature" => {
            Some(DeclarationKind::Method)
        }
        "interface_declaration" => Some(DeclarationKind::Interface),
        "enum_declaration" => Some(DeclarationKind::Enum),
        "type_alias_declaration" => Some(DeclarationKind::TypeAlias),
        "internal_module" | "module" => Some(DeclarationKind::Module),
        "lexical_declaration" | "variable_declaration" if top_level => {
            let declarator = first_declarator(node)?;
            let is_function = declarator.child_by_field_name("value").is_some_and(|value| {
                matches!(
                    value.kind(),
                    "arrow_function" | "function_expression" | "function" | "generator_function"
                )
            });
            if is_function {
                Some(DeclarationKind::Function)
            } else if has_token(node, "const") {
                Some(DeclarationKind::Constant)
            } else {
                Some(DeclarationKind::Variable)
            }
        }
        _ => None,
    }
}

fn first_declarator(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let declarator = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == "variable_declarator");
    declarator
}

/// `NAME = ...` at module level
fn python_assignment_target<'s>(node: Node, source: &'s str) -> Option<&'s str> {
    let assignment = node.named_child(0)?;
    if assignment.kind() != "assignment" {
        return None;
    }
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    text(left, source)
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == token);
    found
}

/// Name of a declaration node
pub(crate) fn declaration_name(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "impl_item" => node
            .child_by_field_name("type")
            .and_then(|target| impl_target(target, source)),
        "lexical_declaration" | "variable_declaration" => first_declarator(node)
            .and_then(|declarator| declarator.child_by_field_name("name"))
            .and_then(|name| text(name, source))
            .map(str::to_string),
        "expression_statement" => python_assignment_target(node, source).map(str::to_string),
        _ => node
            .child_by_field_name("name")
            .and_then(|name| text(name, source))
            .map(str::to_string),
    }
}

/// Base type name of an impl target: `Point`, `Point<T>` and `geo::Point` all give "Point"
fn impl_target(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "type_identifier" => text(node, source).map(str::to_string),
        "generic_type" => node
            .child_by_field_name("type")
            .and_then(|base| impl_target(base, source)),
        "scoped_type_identifier" => node
            .child_by_field_name("name")
            .and_then(|name| text(name, source))
            .map(str::to_string),
        _ => text(node, source).map(str::to_string),
    }
}

/// Modifiers stated on the declaration node itself
pub(crate) fn modifiers(
    language: Language,
    node: Node,
    name: &str,
    source: &str,
) -> BTreeSet<Modifier> {
    let mut modifiers = BTreeSet::new();
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();

    match language {
        Language::Rust => {
            let visibility = children
                .iter()
                .any(|child| child.kind() == "visibility_modifier");
            modifiers.insert(if visibility {
                Modifier::Public
            } else {
                Modifier::Private
            });
            if node.kind() == "static_item" {
                modifiers.insert(Modifier::Static);
            }
            if node.kind() == "function_signature_item" {
                modifiers.insert(Modifier::Abstract);
            }
            if children
                .iter()
                .any(|child| child.kind() == "function_modifiers" && has_token(*child, "async"))
            {
                modifiers.insert(Modifier::Async);
            }
        }
        Language::Python => {
            let private = name.starts_with('_') && !(name.starts_with("__") && name.ends_with("__"));
            modifiers.insert(if private {
                Modifier::Private
            } else {
                Modifier::Public
            });
            if children.iter().any(|child| child.kind() == "async") {
                modifiers.insert(Modifier::Async);
            }
        }
        lang if lang.is_ecmascript() => {
            for child in &children {
                match child.kind() {
                    "accessibility_modifier" => match text(*child, source) {
                        Some("private") => {
                            modifiers.insert(Modifier::Private);
                        }
                        Some("protected") => {
                            modifiers.insert(Modifier::Protected);
                        }
                        _ => {
                            modifiers.insert(Modifier::Public);
                        }
                    },
                    "private_property_identifier" => {
                        modifiers.insert(Modifier::Private);
                    }
                    "static" => {
                        modifiers.insert(Modifier::Static);
                    }
                    "async" => {
                        modifiers.insert(Modifier::Async);
                    }
                    "abstract" => {
                        modifiers.insert(Modifier::Abstract);
                    }
                    _ => {}
                }
            }
            if matches!(
                node.kind(),
                "abstract_class_declaration" | "abstract_method_signature"
            ) {
                modifiers.insert(Modifier::Abstract);
            }
            let is_member = matches!(
                node.kind(),
                "method_definition" | "method_signature" | "abstract_method_signature"
            );
            if is_member
                && !modifiers.contains(&Modifier::Private)
                && !modifiers.contains(&Modifier::Protected)
            {
                modifiers.insert(Modifier::Public);
            }
        }
        _ => {}
    }

    modifiers
}

/// Whether `kind` is an import statement
pub(crate) fn is_import(language: Language, kind: &str) -> bool {
    match language {
        Language::Rust => kind == "use_declaration" || kind == "extern_crate_declaration",
        Language::Python => kind == "import_statement" || kind == "import_from_statement",
        lang if lang.is_ecmascript() => kind == "import_statement",
        _ => false,
    }
}

/// Collect the names an import statement binds in the file
pub(crate) fn imported_names(
    language: Language,
    node: Node,
    source: &str,
    out: &mut BTreeSet<String>,
) {
    match language {
        Language::Rust => match node.kind() {
            "use_declaration" => {
                if let Some(argument) = node.child_by_field_name("argument") {
                    rust_use_names(argument, source, out);
                }
            }
            "extern_crate_declaration" => {
                let bound = node
                    .child_by_field_name("alias")
                    .or_else(|| node.child_by_field_name("name"));
                insert_text(bound, source, out);
            }
            _ => {}
        },
        Language::Python => {
            let from_import = node.kind() == "import_from_statement";
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                match name.kind() {
                    "aliased_import" => insert_text(name.child_by_field_name("alias"), source, out),
                    "dotted_name" => {
                        // `import a.b` binds `a`, `from m import a` binds `a`
                        let count = name.named_child_count();
                        let index = if from_import { count.saturating_sub(1) } else { 0 };
                        insert_text(name.named_child(index), source, out);
                    }
                    _ => {}
                }
            }
        }
        lang if lang.is_ecmascript() => {
            let mut cursor = node.walk();
            let clause = node
                .named_children(&mut cursor)
                .find(|child| child.kind() == "import_clause");
            if let Some(clause) = clause {
                ecmascript_import_clause(clause, source, out);
            }
        }
        _ => {}
    }
}

fn rust_use_names(node: Node, source: &str, out: &mut BTreeSet<String>) {
    match node.kind() {
        "identifier" | "type_identifier" => insert_text(Some(node), source, out),
        "scoped_identifier" => insert_text(node.child_by_field_name("name"), source, out),
        "use_as_clause" => insert_text(node.child_by_field_name("alias"), source, out),
        "scoped_use_list" => {
            if let Some(list) = node.child_by_field_name("list") {
                rust_use_names(list, source, out);
            }
        }
        "use_list" => {
            let mut cursor = node.walk();
            for item in node.named_children(&mut cursor) {
                rust_use_names(item, source, out);
            }
        }
        _ => {}
    }
}

fn ecmascript_import_clause(clause: Node, source: &str, out: &mut BTreeSet<String>) {
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => insert_text(Some(child), source, out),
            "namespace_import" => {
                let mut inner = child.walk();
                let alias = child
                    .named_children(&mut inner)
                    .find(|n| n.kind() == "identifier");
                insert_text(alias, source, out);
            }
            "named_imports" => {
                let mut inner = child.walk();
                for specifier in child
                    .named_children(&mut inner)
                    .filter(|n| n.kind() == "import_specifier")
                {
                    let bound = specifier
                        .child_by_field_name("alias")
                        .or_else(|| specifier.child_by_field_name("name"));
                    insert_text(bound, source, out);
                }
            }
            _ => {}
        }
    }
}

fn insert_text(node: Option<Node>, source: &str, out: &mut BTreeSet<String>) {
    if let Some(name) = node.and_then(|n| text(n, source)) {
        let name = name.trim();
        if !name.is_empty() && name != "self" {
            out.insert(name.to_string());
        }
    }
}
