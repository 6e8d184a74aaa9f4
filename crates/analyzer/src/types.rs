use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One input file: path, UTF-8 content and detected language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceUnit {
    /// Path as given by the caller (used for reporting and cache keys)
    pub path: String,

    /// Full file content
    pub content: String,

    /// Language used to pick a grammar
    pub language: Language,
}

impl SourceUnit {
    /// Create a unit, detecting the language from the path extension
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let language = Language::from_path(&path);
        Self {
            path,
            content: content.into(),
            language,
        }
    }

    /// Builder: override the detected language
    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }
}

/// Kind of declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Function,
    Method,
    Class,
    Struct,
    Enum,
    Interface,
    Module,
    Impl,
    TypeAlias,
    Constant,
    Variable,
}

impl DeclarationKind {
    /// Kinds that group other declarations (classes, impl blocks, traits, modules)
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::Class | Self::Impl | Self::Interface | Self::Module
        )
    }

    /// Kinds whose function members are methods
    #[must_use]
    pub const fn hosts_methods(self) -> bool {
        matches!(self, Self::Class | Self::Impl | Self::Interface)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Module => "module",
            Self::Impl => "impl",
            Self::TypeAlias => "type_alias",
            Self::Constant => "constant",
            Self::Variable => "variable",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Abstract,
    Static,
    Async,
    Exported,
}

/// Complexity measured over a declaration's span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complexity {
    /// 1 + decision points
    pub cyclomatic: u32,

    /// Decision points weighted by nesting depth
    pub cognitive: u32,

    /// Deepest nesting of control-flow constructs
    pub max_nesting: u32,
}

impl Complexity {
    /// Single figure used to compare declarations
    #[must_use]
    pub fn score(&self) -> u32 {
        self.cyclomatic.max(self.cognitive)
    }
}

/// A declaration in a file's declaration tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,

    /// Name prefixed with enclosing declarations ("Point::new", "Cart.total")
    pub qualified_name: String,

    pub kind: DeclarationKind,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    pub start_byte: usize,

    /// Exclusive
    pub end_byte: usize,

    /// Estimated tokens of the declaration text
    pub tokens: usize,

    /// Referenced names resolving to other declarations of the file or to imports
    pub dependencies: BTreeSet<String>,

    pub complexity: Complexity,

    pub modifiers: BTreeSet<Modifier>,

    /// Nested declarations (methods of a class, items of a module, ...)
    pub children: Vec<Declaration>,
}

impl Declaration {
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.end_byte - self.start_byte
    }

    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        self.modifiers.contains(&Modifier::Public) || self.modifiers.contains(&Modifier::Exported)
    }

    /// Container with at least one member
    #[must_use]
    pub fn has_members(&self) -> bool {
        self.kind.is_container() && !self.children.is_empty()
    }

    /// Pre-order iterator over this declaration and all descendants
    pub fn iter(&self) -> DeclarationIter<'_> {
        DeclarationIter { stack: vec![self] }
    }
}

/// Pre-order traversal of declaration trees
#[derive(Debug)]
pub struct DeclarationIter<'a> {
    stack: Vec<&'a Declaration>,
}

impl<'a> Iterator for DeclarationIter<'a> {
    type Item = &'a Declaration;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Why a unit was not analyzed structurally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    UnsupportedLanguage,
    ParseFailure,
    FileTooLarge,
}

impl FallbackReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedLanguage => "unsupported language",
            Self::ParseFailure => "parse failure",
            Self::FileTooLarge => "file too large",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of analyzing one source unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub path: String,

    pub language: Language,

    /// Whether `declarations` reflects a successful parse
    pub structural: bool,

    /// Top-level declarations; empty when not structural
    pub declarations: Vec<Declaration>,

    /// Import statements, one line each
    pub imports: Vec<String>,

    /// Names bound by the imports
    pub imported_names: BTreeSet<String>,

    /// Estimated tokens of the whole file
    pub estimated_tokens: usize,

    pub line_count: usize,

    pub size_bytes: usize,

    /// SHA-256 of the content, hex encoded
    pub content_hash: String,

    /// Set when `structural` is false
    pub fallback: Option<FallbackReason>,
}

impl AnalysisResult {
    /// Result for a unit handled as opaque text
    pub(crate) fn opaque(
        unit: &SourceUnit,
        estimated_tokens: usize,
        content_hash: String,
        reason: FallbackReason,
    ) -> Self {
        Self {
            path: unit.path.clone(),
            language: unit.language,
            structural: false,
            declarations: Vec::new(),
            imports: Vec::new(),
            imported_names: BTreeSet::new(),
            estimated_tokens,
            line_count: unit.content.lines().count(),
            size_bytes: unit.size_bytes(),
            content_hash,
            fallback: Some(reason),
        }
    }

    /// All declarations, pre-order
    pub fn iter_declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().flat_map(Declaration::iter)
    }

    /// Number of declarations at every depth
    #[must_use]
    pub fn declaration_count(&self) -> usize {
        self.iter_declarations().count()
    }

    /// Highest complexity score of any top-level declaration
    #[must_use]
    pub fn max_complexity(&self) -> u32 {
        self.declarations
            .iter()
            .map(|d| d.complexity.score())
            .max()
            .unwrap_or(0)
    }
}

impl AsRef<AnalysisResult> for AnalysisResult {
    fn as_ref(&self) -> &AnalysisResult {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, kind: DeclarationKind, children: Vec<Declaration>) -> Declaration {
        Declaration {
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind,
            start_line: 1,
            end_line: 3,
            start_byte: 0,
            end_byte: 10,
            tokens: 3,
            dependencies: BTreeSet::new(),
            complexity: Complexity::default(),
            modifiers: BTreeSet::new(),
            children,
        }
    }

    #[test]
    fn test_source_unit_detects_language() {
        let unit = SourceUnit::new("src/app.tsx", "export const a = 1;");
        assert_eq!(unit.language, Language::Tsx);
        assert_eq!(unit.size_bytes(), 19);

        let unit = unit.with_language(Language::TypeScript);
        assert_eq!(unit.language, Language::TypeScript);
    }

    #[test]
    fn test_iter_is_preorder() {
        let tree = decl(
            "Shop",
            DeclarationKind::Class,
            vec![
                decl("add", DeclarationKind::Method, vec![]),
                decl(
                    "Inner",
                    DeclarationKind::Class,
                    vec![decl("deep", DeclarationKind::Method, vec![])],
                ),
                decl("remove", DeclarationKind::Method, vec![]),
            ],
        );

        let names: Vec<_> = tree.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Shop", "add", "Inner", "deep", "remove"]);
        assert!(tree.has_members());
    }

    #[test]
    fn test_complexity_score() {
        let complexity = Complexity {
            cyclomatic: 4,
            cognitive: 9,
            max_nesting: 3,
        };
        assert_eq!(complexity.score(), 9);
    }

    #[test]
    fn test_fallback_reason_display() {
        assert_eq!(FallbackReason::FileTooLarge.to_string(), "file too large");
        assert_eq!(
            serde_json::to_string(&FallbackReason::UnsupportedLanguage).unwrap(),
            "\"unsupported-language\""
        );
    }
}
