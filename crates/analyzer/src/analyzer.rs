use crate::cache::content_hash;
use crate::complexity;
use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, Result};
use crate::grammar::{self, ANONYMOUS};
use crate::language::Language;
use crate::references;
use crate::types::{AnalysisResult, Declaration, DeclarationKind, FallbackReason, Modifier, SourceUnit};
use review_tokens::TokenCounter;
use std::collections::{BTreeSet, HashMap};
use tree_sitter::{Node, Parser};

/// Tree-sitter based analyzer producing declaration trees.
///
/// Owns one parser per supported grammar, so an instance must not be shared between
/// threads; batch analysis gives every worker its own.
pub struct StructuralAnalyzer {
    config: AnalyzerConfig,
    counter: TokenCounter,
    parsers: HashMap<Language, Parser>,
}

/// A node promoted to a declaration, possibly through a wrapper
struct Candidate<'tree> {
    /// Node whose span the declaration covers (the wrapper, if any)
    outer: Node<'tree>,
    /// The declaration node itself
    inner: Node<'tree>,
    kind: DeclarationKind,
    modifiers: BTreeSet<Modifier>,
}

#[derive(Clone)]
struct Scope {
    qualified_prefix: Option<String>,
    hosts_methods: bool,
    top_level: bool,
}

impl Scope {
    fn file() -> Self {
        Self {
            qualified_prefix: None,
            hosts_methods: false,
            top_level: true,
        }
    }

    /// Scope for nodes walked through without being declarations
    fn transparent(&self) -> Self {
        Self {
            top_level: false,
            ..self.clone()
        }
    }
}

struct FileContext<'a> {
    source: &'a str,
    language: Language,
}

impl StructuralAnalyzer {
    /// Create an analyzer counting tokens with `counter`
    pub fn new(config: AnalyzerConfig, counter: TokenCounter) -> Result<Self> {
        config.validate()?;

        let mut parsers = HashMap::new();
        for language in Language::STRUCTURAL {
            let mut parser = Parser::new();
            parser
                .set_language(&language.tree_sitter_language()?)
                .map_err(|e| AnalyzerError::tree_sitter(format!("Failed to set language: {e}")))?;
            parsers.insert(language, parser);
        }

        Ok(Self {
            config,
            counter,
            parsers,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    #[must_use]
    pub const fn counter(&self) -> &TokenCounter {
        &self.counter
    }

    /// Analyze one unit. Never fails: anything that cannot be analyzed structurally is
    /// returned with `structural = false` and a fallback reason.
    pub fn analyze(&mut self, unit: &SourceUnit) -> AnalysisResult {
        let estimated_tokens = self.counter.count(&unit.content);
        let hash = content_hash(&unit.content);

        let Some(parser) = self.parsers.get_mut(&unit.language) else {
            log::debug!("{}: {} is not analyzed structurally", unit.path, unit.language);
            return AnalysisResult::opaque(
                unit,
                estimated_tokens,
                hash,
                FallbackReason::UnsupportedLanguage,
            );
        };

        if unit.size_bytes() > self.config.max_file_bytes {
            log::debug!(
                "{}: {} bytes exceeds max_file_bytes ({})",
                unit.path,
                unit.size_bytes(),
                self.config.max_file_bytes
            );
            return AnalysisResult::opaque(unit, estimated_tokens, hash, FallbackReason::FileTooLarge);
        }

        let Some(tree) = parser.parse(&unit.content, None) else {
            log::warn!("{}: parser returned no tree", unit.path);
            return AnalysisResult::opaque(unit, estimated_tokens, hash, FallbackReason::ParseFailure);
        };

        let root = tree.root_node();
        if root.has_error() {
            log::warn!("{}: syntax errors, treating as plain text", unit.path);
            return AnalysisResult::opaque(unit, estimated_tokens, hash, FallbackReason::ParseFailure);
        }

        let ctx = FileContext {
            source: &unit.content,
            language: unit.language,
        };

        let mut imports = Vec::new();
        let mut imported_names = BTreeSet::new();
        collect_imports(&ctx, root, &mut imports, &mut imported_names);

        let mut declarations = Vec::new();
        self.collect(&ctx, root, &Scope::file(), &mut declarations);
        references::resolve(
            &mut declarations,
            &imported_names,
            self.config.max_references_per_declaration,
        );

        log::debug!(
            "{}: {} top-level declarations, {} imports",
            unit.path,
            declarations.len(),
            imports.len()
        );

        AnalysisResult {
            path: unit.path.clone(),
            language: unit.language,
            structural: true,
            declarations,
            imports,
            imported_names,
            estimated_tokens,
            line_count: unit.content.lines().count(),
            size_bytes: unit.size_bytes(),
            content_hash: hash,
            fallback: None,
        }
    }

    /// Depth-first walk promoting recognized nodes; everything else is walked through
    fn collect(&self, ctx: &FileContext, node: Node, scope: &Scope, out: &mut Vec<Declaration>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match classify(ctx, child, scope.top_level) {
                Some(candidate) => out.push(self.build(ctx, candidate, scope)),
                None => self.collect(ctx, child, &scope.transparent(), out),
            }
        }
    }

    fn build(&self, ctx: &FileContext, candidate: Candidate, scope: &Scope) -> Declaration {
        let Candidate {
            outer,
            inner,
            kind,
            modifiers: wrapper_modifiers,
        } = candidate;

        let name =
            grammar::declaration_name(inner, ctx.source).unwrap_or_else(|| ANONYMOUS.to_string());
        let kind = if kind == DeclarationKind::Function && scope.hosts_methods {
            DeclarationKind::Method
        } else {
            kind
        };
        let qualified_name = match &scope.qualified_prefix {
            Some(prefix) => format!("{prefix}{}{name}", ctx.language.scope_separator()),
            None => name.clone(),
        };

        let mut modifiers = grammar::modifiers(ctx.language, inner, &name, ctx.source);
        modifiers.extend(wrapper_modifiers);

        let child_scope = Scope {
            qualified_prefix: Some(qualified_name.clone()),
            hosts_methods: kind.hosts_methods(),
            top_level: false,
        };
        let mut children = Vec::new();
        self.collect(ctx, inner, &child_scope, &mut children);

        let start_byte = outer.start_byte();
        let end_byte = outer.end_byte();
        let start_line = outer.start_position().row + 1;
        let end = outer.end_position();
        // a span ending at column 0 finishes on the previous line
        let end_line = if end.column == 0 && end.row + 1 > start_line {
            end.row
        } else {
            end.row + 1
        };

        Declaration {
            name,
            qualified_name,
            kind,
            start_line,
            end_line,
            start_byte,
            end_byte,
            tokens: self.counter.count(&ctx.source[start_byte..end_byte]),
            // raw references; narrowed by references::resolve once the tree is complete
            dependencies: references::collect(outer, ctx.source),
            complexity: complexity::measure(inner),
            modifiers,
            children,
        }
    }
}

fn classify<'tree>(ctx: &FileContext, node: Node<'tree>, top_level: bool) -> Option<Candidate<'tree>> {
    if let Some(field) = grammar::wrapper_field(ctx.language, node.kind()) {
        let inner = node.child_by_field_name(field)?;
        let mut candidate = classify(ctx, inner, top_level)?;
        candidate.outer = node;
        candidate
            .modifiers
            .extend(grammar::wrapper_modifiers(ctx.language, node, ctx.source));
        return Some(candidate);
    }

    let kind = grammar::declaration_kind(ctx.language, node, ctx.source, top_level)?;
    Some(Candidate {
        outer: node,
        inner: node,
        kind,
        modifiers: BTreeSet::new(),
    })
}

fn collect_imports(
    ctx: &FileContext,
    node: Node,
    imports: &mut Vec<String>,
    imported_names: &mut BTreeSet<String>,
) {
    if grammar::is_import(ctx.language, node.kind()) {
        if let Some(statement) = grammar::text(node, ctx.source) {
            let cleaned = statement.trim().trim_end_matches(';');
            let first_line = cleaned.lines().next().unwrap_or(cleaned);
            if !first_line.is_empty() {
                imports.push(first_line.to_string());
            }
        }
        grammar::imported_names(ctx.language, node, ctx.source, imported_names);
        return;
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_imports(ctx, child, imports, imported_names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn analyzer() -> StructuralAnalyzer {
        StructuralAnalyzer::new(AnalyzerConfig::default(), TokenCounter::default()).unwrap()
    }

    fn find<'a>(result: &'a AnalysisResult, qualified: &str) -> &'a Declaration {
        result
            .iter_declarations()
            .find(|d| d.qualified_name == qualified)
            .unwrap_or_else(|| panic!("{qualified} not found"))
    }

    #[test]
    fn test_rust_declarations() {
        let code = r#"use std::collections::HashMap;

/// A point
#[derive(Debug)]
pub struct Point {
    x: i32,
    y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    async fn norm(&self) -> i32 {
        self.x * self.x + self.y * self.y
    }
}

fn lookup(map: &HashMap<String, Point>) -> Option<&Point> {
    map.get("origin")
}
"#;
        let result = analyzer().analyze(&SourceUnit::new("geo.rs", code));

        assert!(result.structural);
        assert_eq!(result.fallback, None);
        assert_eq!(result.imports, vec!["use std::collections::HashMap"]);
        assert!(result.imported_names.contains("HashMap"));

        let top: Vec<_> = result
            .declarations
            .iter()
            .map(|d| (d.name.as_str(), d.kind))
            .collect();
        assert_eq!(
            top,
            vec![
                ("Point", DeclarationKind::Struct),
                ("Point", DeclarationKind::Impl),
                ("lookup", DeclarationKind::Function),
            ]
        );

        let point = &result.declarations[0];
        assert!(point.modifiers.contains(&Modifier::Public));
        assert_eq!(point.start_line, 5);
        assert_eq!(point.end_line, 8);

        let new = find(&result, "Point::new");
        assert_eq!(new.kind, DeclarationKind::Method);
        assert!(new.modifiers.contains(&Modifier::Public));

        let norm = find(&result, "Point::norm");
        assert!(norm.modifiers.contains(&Modifier::Async));
        assert!(norm.modifiers.contains(&Modifier::Private));

        let lookup = find(&result, "lookup");
        assert!(lookup.dependencies.contains("HashMap"));
        assert!(lookup.dependencies.contains("Point"));
        assert!(!lookup.dependencies.contains("lookup"));
    }

    #[test]
    fn test_rust_nested_module_methods() {
        let code = r"
mod api {
    pub struct Car;

    impl Car {
        pub fn drive(&self) {}
        fn stop(&self) {}
    }

    fn helper() {}
}
";
        let result = analyzer().analyze(&SourceUnit::new("nested.rs", code));
        assert_eq!(result.declarations.len(), 1);

        let module = &result.declarations[0];
        assert_eq!(module.kind, DeclarationKind::Module);
        assert!(module.has_members());

        assert_eq!(find(&result, "api::Car::drive").kind, DeclarationKind::Method);
        assert_eq!(find(&result, "api::Car::stop").kind, DeclarationKind::Method);
        // a module does not turn its functions into methods
        assert_eq!(find(&result, "api::helper").kind, DeclarationKind::Function);
        // the impl depends on the struct it implements, the module contains both
        assert!(find(&result, "api::Car").dependencies.is_empty());
        assert!(module.dependencies.is_empty());
    }

    #[test]
    fn test_python_declarations() {
        let code = r#"import os
from typing import List as L

MAX_ITEMS = 10


class Cart:
    @staticmethod
    def empty():
        return Cart()

    def _total(self, items: L):
        return sum(items)


async def fetch(path):
    return os.path.join(path, "x")
"#;
        let result = analyzer().analyze(&SourceUnit::new("cart.py", code));

        assert!(result.structural);
        assert_eq!(
            result.imported_names.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["L", "os"]
        );

        let kinds: Vec<_> = result.declarations.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DeclarationKind::Constant,
                DeclarationKind::Class,
                DeclarationKind::Function
            ]
        );

        let empty = find(&result, "Cart.empty");
        assert_eq!(empty.kind, DeclarationKind::Method);
        assert!(empty.modifiers.contains(&Modifier::Static));
        // decorator belongs to the declaration span
        assert_eq!(empty.start_line, 8);
        assert!(empty.dependencies.contains("Cart"));

        let total = find(&result, "Cart._total");
        assert!(total.modifiers.contains(&Modifier::Private));
        assert!(total.dependencies.contains("L"));

        let fetch = find(&result, "fetch");
        assert!(fetch.modifiers.contains(&Modifier::Async));
        assert!(fetch.dependencies.contains("os"));
    }

    #[test]
    fn test_typescript_declarations() {
        let code = r#"import { Store, Item as Entry } from "./store";

export interface Priced {
    price(): number;
}

export class Basket implements Priced {
    private items: Entry[] = [];

    static create(): Basket {
        return new Basket();
    }

    price(): number {
        return this.items.length;
    }
}

export const total = (store: Store) => store.size;
"#;
        let result = analyzer().analyze(&SourceUnit::new("basket.ts", code));
        assert!(result.structural, "{:?}", result.fallback);
        assert!(result.imported_names.contains("Store"));
        assert!(result.imported_names.contains("Entry"));

        let top: Vec<_> = result
            .declarations
            .iter()
            .map(|d| (d.name.as_str(), d.kind))
            .collect();
        assert_eq!(
            top,
            vec![
                ("Priced", DeclarationKind::Interface),
                ("Basket", DeclarationKind::Class),
                ("total", DeclarationKind::Function),
            ]
        );

        let basket = find(&result, "Basket");
        assert!(basket.modifiers.contains(&Modifier::Exported));
        // export keyword is inside the span
        assert_eq!(basket.start_byte, code.find("export class").unwrap());
        assert!(basket.dependencies.contains("Priced"));
        assert!(basket.dependencies.contains("Entry"));

        let create = find(&result, "Basket.create");
        assert_eq!(create.kind, DeclarationKind::Method);
        assert!(create.modifiers.contains(&Modifier::Static));
        assert!(create.modifiers.contains(&Modifier::Public));

        assert!(find(&result, "total").dependencies.contains("Store"));
    }

    #[test]
    fn test_unsupported_language_is_not_an_error() {
        let unit = SourceUnit::new("package.json", "{\"name\": \"demo\"}\n");
        let result = analyzer().analyze(&unit);

        assert!(!result.structural);
        assert_eq!(result.fallback, Some(FallbackReason::UnsupportedLanguage));
        assert!(result.declarations.is_empty());
        assert_eq!(result.estimated_tokens, 5);
        assert_eq!(result.line_count, 1);
    }

    #[test]
    fn test_parse_failure_gives_no_partial_tree() {
        let unit = SourceUnit::new("broken.rs", "fn ok() {}\nfn broken( {\n");
        let result = analyzer().analyze(&unit);

        assert!(!result.structural);
        assert_eq!(result.fallback, Some(FallbackReason::ParseFailure));
        assert!(result.declarations.is_empty());
    }

    #[test]
    fn test_file_too_large() {
        let config = AnalyzerConfig {
            max_file_bytes: 16,
            ..Default::default()
        };
        let mut analyzer = StructuralAnalyzer::new(config, TokenCounter::default()).unwrap();
        let unit = SourceUnit::new("big.rs", "fn a() {}\nfn b() {}\nfn c() {}\n");
        let result = analyzer.analyze(&unit);

        assert!(!result.structural);
        assert_eq!(result.fallback, Some(FallbackReason::FileTooLarge));
        assert_eq!(result.fallback.unwrap().to_string(), "file too large");
        assert_eq!(result.estimated_tokens, 8);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let unit = SourceUnit::new("geo.rs", "pub fn a() -> u8 { b() }\nfn b() -> u8 { 1 }\n");
        let first = analyzer().analyze(&unit);
        let second = analyzer().analyze(&unit);
        assert_eq!(first, second);
        assert!(find(&first, "a").dependencies.contains("b"));
    }
}
