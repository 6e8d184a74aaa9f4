//! Planning atoms: the pieces chunks are assembled from.
//!
//! A structural file is cut into one unit per top-level declaration. Each unit owns the
//! text before its declaration (comments, attributes, imports, blank lines) and the last
//! one also owns the trailing text, so the units of a file tile it exactly. Files that
//! cannot be cut that way become one whole-file atom or a run of line windows.

use review_analyzer::AnalysisResult;
use review_tokens::TokenCounter;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Atom {
    pub file_index: usize,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub tokens: usize,
    pub kind: AtomKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AtomKind {
    Unit(UnitInfo),
    WholeFile,
    Lines,
}

/// Facts about a unit's declaration used by strategy selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct UnitInfo {
    /// None for a structural file without declarations
    pub name: Option<String>,
    /// Class, impl, trait or module with members
    pub container: bool,
    pub complexity: u32,
    /// Names declared inside the unit, its own included
    pub defines: BTreeSet<String>,
    pub dependencies: BTreeSet<String>,
}

impl Atom {
    pub fn unit(&self) -> Option<&UnitInfo> {
        match &self.kind {
            AtomKind::Unit(info) => Some(info),
            _ => None,
        }
    }

    pub fn position(&self) -> (usize, usize) {
        (self.file_index, self.start_byte)
    }
}

/// Byte offsets of line starts
#[derive(Debug, Clone)]
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(content: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1)
                .filter(|&start| start < content.len()),
        );
        Self { starts }
    }

    /// 1-based line holding `byte`
    pub fn line_of(&self, byte: usize) -> usize {
        self.starts.partition_point(|&start| start <= byte).max(1)
    }

    /// Start of the line after the one holding `byte`, if any
    pub fn next_line_start(&self, byte: usize) -> Option<usize> {
        self.starts.get(self.line_of(byte)).copied()
    }

    /// Inclusive line range of `[start, end)`
    pub fn span(&self, start: usize, end: usize) -> (usize, usize) {
        let first = self.line_of(start);
        if end > start {
            (first, self.line_of(end - 1))
        } else {
            (first, first)
        }
    }
}

/// Cut a structural file into units.
///
/// Returns `None` when the declaration spans do not fit `content` (stale analysis).
pub(crate) fn cut_units(
    file_index: usize,
    content: &str,
    result: &AnalysisResult,
    lines: &LineIndex,
    counter: &TokenCounter,
) -> Option<Vec<Atom>> {
    let declarations = &result.declarations;
    if declarations.is_empty() {
        return Some(vec![Atom {
            kind: AtomKind::Unit(UnitInfo::default()),
            ..whole_file(file_index, content, lines, counter)
        }]);
    }

    let mut previous_end = 0;
    for declaration in declarations {
        let valid = declaration.start_byte >= previous_end
            && declaration.start_byte <= declaration.end_byte
            && declaration.end_byte <= content.len()
            && content.is_char_boundary(declaration.start_byte)
            && content.is_char_boundary(declaration.end_byte);
        if !valid {
            return None;
        }
        previous_end = declaration.end_byte;
    }

    let mut boundaries = Vec::with_capacity(declarations.len() + 1);
    boundaries.push(0);
    for pair in declarations.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        let boundary = match previous
            .end_byte
            .checked_sub(1)
            .and_then(|last| lines.next_line_start(last))
        {
            // previous declaration ends on an earlier line: cut at the line after it
            Some(line_start) if line_start <= next.start_byte => line_start,
            _ => previous.end_byte,
        };
        boundaries.push(boundary);
    }
    boundaries.push(content.len());

    let atoms = declarations
        .iter()
        .zip(boundaries.windows(2))
        .map(|(declaration, bounds)| {
            let (start, end) = (bounds[0], bounds[1]);
            let (start_line, end_line) = lines.span(start, end);
            Atom {
                file_index,
                start_byte: start,
                end_byte: end,
                start_line,
                end_line,
                tokens: counter.count(&content[start..end]),
                kind: AtomKind::Unit(UnitInfo {
                    name: Some(declaration.name.clone()),
                    container: declaration.has_members(),
                    complexity: declaration.complexity.score(),
                    defines: declaration.iter().map(|d| d.name.clone()).collect(),
                    dependencies: declaration.dependencies.clone(),
                }),
            }
        })
        .collect();

    Some(atoms)
}

pub(crate) fn whole_file(
    file_index: usize,
    content: &str,
    lines: &LineIndex,
    counter: &TokenCounter,
) -> Atom {
    let (start_line, end_line) = lines.span(0, content.len());
    Atom {
        file_index,
        start_byte: 0,
        end_byte: content.len(),
        start_line,
        end_line,
        tokens: counter.count(content),
        kind: AtomKind::WholeFile,
    }
}

/// Windows of at most `max_lines` whole lines and, unless a single line is larger,
/// at most `target` tokens.
pub(crate) fn line_windows(
    file_index: usize,
    content: &str,
    lines: &LineIndex,
    max_lines: usize,
    target: usize,
    counter: &TokenCounter,
) -> Vec<Atom> {
    if content.is_empty() {
        return vec![whole_file(file_index, content, lines, counter)];
    }

    let mut windows = Vec::new();
    let mut push = |start: usize, end: usize| {
        let (start_line, end_line) = lines.span(start, end);
        windows.push(Atom {
            file_index,
            start_byte: start,
            end_byte: end,
            start_line,
            end_line,
            tokens: counter.count(&content[start..end]),
            kind: AtomKind::Lines,
        });
    };

    let mut start = 0;
    let mut offset = 0;
    let mut line_count = 0;
    let mut estimate = 0;
    for line in content.split_inclusive('\n') {
        let line_tokens = counter.count(line);
        if line_count > 0 && (line_count >= max_lines || estimate + line_tokens > target) {
            push(start, offset);
            start = offset;
            line_count = 0;
            estimate = 0;
        }
        line_count += 1;
        estimate += line_tokens;
        offset += line.len();
    }
    push(start, offset);

    windows
}
