use crate::types::Complexity;
use tree_sitter::Node;

/// Measure cyclomatic, cognitive and nesting complexity of a subtree
pub(crate) fn measure(node: Node) -> Complexity {
    let mut complexity = Complexity {
        cyclomatic: 1,
        ..Complexity::default()
    };
    visit(node, 0, &mut complexity);
    complexity
}

fn visit(node: Node, nesting: u32, complexity: &mut Complexity) {
    let kind = node.kind();
    let mut child_nesting = nesting;

    if is_decision(node) {
        complexity.cyclomatic += 1;
    }

    if is_nesting_construct(node) {
        complexity.cognitive += 1 + nesting;
        child_nesting = nesting + 1;
        complexity.max_nesting = complexity.max_nesting.max(child_nesting);
    } else if matches!(kind, "else_clause" | "elif_clause") || is_boolean_operator(node) {
        complexity.cognitive += 1;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, child_nesting, complexity);
    }
}

/// Branches counted by cyclomatic complexity
fn is_decision(node: Node) -> bool {
    match node.kind() {
        // Conditionals
        "if_expression" | "if_statement" | "elif_clause" => true,
        // Ternaries
        "ternary_expression" | "conditional_expression" => true,
        // Loops
        "while_expression" | "while_statement" | "loop_expression" | "for_expression"
        | "for_statement" | "for_in_statement" | "do_statement" => true,
        // Case arms
        "match_arm" | "switch_case" | "case_clause" => true,
        // Exception handlers
        "catch_clause" | "except_clause" => true,
        _ => is_boolean_operator(node),
    }
}

/// Constructs that add `1 + nesting` to cognitive complexity and nest their bodies.
///
/// An `if` that is the body of an `else` continues a chain and does not nest.
fn is_nesting_construct(node: Node) -> bool {
    match node.kind() {
        "if_expression" | "if_statement" => node
            .parent()
            .map_or(true, |parent| parent.kind() != "else_clause"),
        "while_expression" | "while_statement" | "loop_expression" | "for_expression"
        | "for_statement" | "for_in_statement" | "do_statement" => true,
        "match_expression" | "switch_statement" | "match_statement" => true,
        "catch_clause" | "except_clause" => true,
        "ternary_expression" | "conditional_expression" => true,
        _ => false,
    }
}

/// Short-circuit `&&`, `||`, `??`, `and`, `or`
fn is_boolean_operator(node: Node) -> bool {
    if !matches!(node.kind(), "binary_expression" | "boolean_operator") {
        return false;
    }
    node.child_by_field_name("operator")
        .is_some_and(|op| matches!(op.kind(), "&&" | "||" | "??" | "and" | "or"))
}
