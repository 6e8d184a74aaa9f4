//! Grouping atoms per strategy, packing groups into bins and turning bins into chunks.

use crate::atoms::{Atom, AtomKind};
use crate::graph::UnitGraph;
use crate::types::{Chunk, ChunkingStrategy, Consolidation, Segment, SegmentKind};
use log::debug;
use review_analyzer::SourceUnit;
use std::collections::BTreeSet;

/// Atoms that must land in the same bin
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Group {
    /// Indices into the atom list, ascending
    pub atoms: Vec<usize>,
    pub tokens: usize,
    /// Gets a bin of its own
    pub solo: bool,
}

impl Group {
    fn single(atoms: &[Atom], index: usize, solo: bool) -> Self {
        Self {
            atoms: vec![index],
            tokens: atoms[index].tokens,
            solo,
        }
    }

    fn of(atoms: &[Atom], mut members: Vec<usize>) -> Self {
        members.sort_unstable();
        Self {
            tokens: members.iter().map(|&i| atoms[i].tokens).sum(),
            atoms: members,
            solo: false,
        }
    }

    fn first(&self) -> usize {
        self.atoms.first().copied().unwrap_or(usize::MAX)
    }
}

/// Bins of atom indices for `strategy`. `atoms` must be sorted by position.
pub(crate) fn bins_for(
    strategy: ChunkingStrategy,
    atoms: &[Atom],
    target: usize,
) -> Vec<Vec<usize>> {
    match strategy {
        ChunkingStrategy::Grouped => first_fit_decreasing(singletons(atoms, |_| false), target),
        ChunkingStrategy::Individual => {
            next_fit(singletons(atoms, |atom| atom.unit().is_some()), target)
        }
        ChunkingStrategy::Hierarchical => next_fit(
            singletons(atoms, |atom| atom.unit().is_some_and(|info| info.container)),
            target,
        ),
        ChunkingStrategy::Contextual => next_fit(contextual_groups(atoms, target), target),
        ChunkingStrategy::Functional => next_fit(functional_groups(atoms, target), target),
        ChunkingStrategy::LineBased
        | ChunkingStrategy::SingleFile
        | ChunkingStrategy::EmergencySingleChunk => next_fit(singletons(atoms, |_| false), target),
    }
}

fn singletons(atoms: &[Atom], solo: impl Fn(&Atom) -> bool) -> Vec<Group> {
    (0..atoms.len())
        .map(|i| Group::single(atoms, i, solo(&atoms[i])))
        .collect()
}

/// Indices of unit atoms plus a singleton group for every other atom
fn split_units(atoms: &[Atom]) -> (Vec<usize>, Vec<Group>) {
    let mut units = Vec::new();
    let mut others = Vec::new();
    for (i, atom) in atoms.iter().enumerate() {
        if atom.unit().is_some() {
            units.push(i);
        } else {
            others.push(Group::single(atoms, i, false));
        }
    }
    (units, others)
}

/// Each unit with as many of its unassigned direct dependencies as fit the target.
///
/// A unit whose dependency already sits in an earlier group joins that group when
/// there is room, so callers declared after their callees still share a chunk.
fn contextual_groups(atoms: &[Atom], target: usize) -> Vec<Group> {
    let (units, mut groups) = split_units(atoms);
    let unit_atoms: Vec<&Atom> = units.iter().map(|&i| &atoms[i]).collect();
    let graph = UnitGraph::build(&unit_atoms);
    debug!(
        "Dependency graph: {} units, {} edges",
        unit_atoms.len(),
        graph.edge_count()
    );

    // (members, tokens) per group; owner[u] is the group holding unit u
    let mut unit_groups: Vec<(Vec<usize>, usize)> = Vec::new();
    let mut owner: Vec<Option<usize>> = vec![None; units.len()];
    for u in 0..units.len() {
        if owner[u].is_some() {
            continue;
        }
        let dependencies = graph.dependencies(u);
        let size = unit_atoms[u].tokens;
        let joined = dependencies
            .iter()
            .filter_map(|&d| owner[d])
            .find(|&g| unit_groups[g].1 + size <= target);
        let g = joined.unwrap_or_else(|| {
            unit_groups.push((Vec::new(), 0));
            unit_groups.len() - 1
        });
        if joined.is_some() {
            debug!("unit {u} joins the group of its dependency");
        }

        owner[u] = Some(g);
        unit_groups[g].0.push(units[u]);
        unit_groups[g].1 += size;
        for d in dependencies {
            if owner[d].is_none() && unit_groups[g].1 + unit_atoms[d].tokens <= target {
                owner[d] = Some(g);
                unit_groups[g].0.push(units[d]);
                unit_groups[g].1 += unit_atoms[d].tokens;
            }
        }
    }

    groups.extend(
        unit_groups
            .into_iter()
            .map(|(members, _)| Group::of(atoms, members)),
    );
    groups.sort_by_key(Group::first);
    groups
}

/// Same-file connected components, split in order where larger than the target
fn functional_groups(atoms: &[Atom], target: usize) -> Vec<Group> {
    let (units, mut groups) = split_units(atoms);
    let unit_atoms: Vec<&Atom> = units.iter().map(|&i| &atoms[i]).collect();
    let graph = UnitGraph::build(&unit_atoms);

    for component in graph.file_components() {
        let mut members = Vec::new();
        let mut tokens = 0;
        for u in component {
            let size = unit_atoms[u].tokens;
            if !members.is_empty() && tokens + size > target {
                groups.push(Group::of(atoms, std::mem::take(&mut members)));
                tokens = 0;
            }
            members.push(units[u]);
            tokens += size;
        }
        if !members.is_empty() {
            groups.push(Group::of(atoms, members));
        }
    }

    groups.sort_by_key(Group::first);
    groups
}

/// Fill the current bin in order; a group that does not fit opens the next one.
pub(crate) fn next_fit(groups: Vec<Group>, target: usize) -> Vec<Vec<usize>> {
    let mut bins = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut tokens = 0;

    for group in groups {
        if group.solo {
            if !current.is_empty() {
                bins.push(std::mem::take(&mut current));
                tokens = 0;
            }
            bins.push(group.atoms);
            continue;
        }
        if !current.is_empty() && tokens + group.tokens > target {
            bins.push(std::mem::take(&mut current));
            tokens = 0;
        }
        tokens += group.tokens;
        current.extend(group.atoms);
    }
    if !current.is_empty() {
        bins.push(current);
    }

    bins
}

/// Largest groups first, each into the first bin with room
pub(crate) fn first_fit_decreasing(mut groups: Vec<Group>, target: usize) -> Vec<Vec<usize>> {
    groups.sort_by(|a, b| b.tokens.cmp(&a.tokens));

    let mut bins: Vec<(usize, Vec<usize>)> = Vec::new();
    for group in groups {
        match bins
            .iter_mut()
            .find(|(used, _)| used + group.tokens <= target)
        {
            Some((used, members)) => {
                *used += group.tokens;
                members.extend(group.atoms);
            }
            None => bins.push((group.tokens, group.atoms)),
        }
    }

    bins.into_iter().map(|(_, members)| members).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentClass {
    Declarations,
    WholeFile,
    Lines,
}

fn classify(atom: &Atom) -> SegmentClass {
    match &atom.kind {
        AtomKind::Unit(info) if info.name.is_some() => SegmentClass::Declarations,
        AtomKind::Unit(_) | AtomKind::WholeFile => SegmentClass::WholeFile,
        AtomKind::Lines => SegmentClass::Lines,
    }
}

/// Turn bins into chunks ordered by first segment, with `priority` set to the rank.
pub(crate) fn build_chunks(
    strategy: ChunkingStrategy,
    atoms: &[Atom],
    bins: Vec<Vec<usize>>,
    units: &[SourceUnit],
) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = bins
        .into_iter()
        .filter(|bin| !bin.is_empty())
        .map(|bin| build_chunk(strategy, atoms, bin, units))
        .collect();

    chunks.sort_by_key(Chunk::position);
    for (rank, chunk) in chunks.iter_mut().enumerate() {
        chunk.priority = rank;
    }
    chunks
}

fn build_chunk(
    strategy: ChunkingStrategy,
    atoms: &[Atom],
    mut bin: Vec<usize>,
    units: &[SourceUnit],
) -> Chunk {
    bin.sort_by_key(|&i| atoms[i].position());

    let mut segments: Vec<Segment> = Vec::new();
    let mut previous: Option<&Atom> = None;
    for &index in &bin {
        let atom = &atoms[index];
        let class = classify(atom);
        let extends = previous.is_some_and(|prev| {
            prev.file_index == atom.file_index
                && prev.end_byte == atom.start_byte
                && classify(prev) == class
                && class != SegmentClass::WholeFile
        });

        match segments.last_mut() {
            Some(segment) if extends => {
                segment.end_byte = atom.end_byte;
                segment.end_line = atom.end_line;
                segment.tokens += atom.tokens;
                if let (SegmentKind::Declarations { names }, Some(info)) =
                    (&mut segment.kind, atom.unit())
                {
                    names.extend(info.name.iter().cloned());
                }
            }
            _ => segments.push(Segment {
                file_index: atom.file_index,
                path: units[atom.file_index].path.clone(),
                start_byte: atom.start_byte,
                end_byte: atom.end_byte,
                start_line: atom.start_line,
                end_line: atom.end_line,
                kind: match class {
                    SegmentClass::Declarations => SegmentKind::Declarations {
                        names: atom.unit().and_then(|info| info.name.clone()).into_iter().collect(),
                    },
                    SegmentClass::WholeFile => SegmentKind::WholeFile,
                    SegmentClass::Lines => SegmentKind::Lines,
                },
                tokens: atom.tokens,
            }),
        }
        previous = Some(atom);
    }

    let tag = if bin.iter().any(|&i| atoms[i].unit().is_some()) {
        strategy
    } else if segments.iter().any(|s| s.kind == SegmentKind::Lines) {
        ChunkingStrategy::LineBased
    } else {
        ChunkingStrategy::SingleFile
    };

    let consolidation = (bin.len() > 1).then(|| Consolidation {
        merged_units: bin.len(),
        files: segments
            .iter()
            .map(|s| s.file_index)
            .collect::<BTreeSet<_>>()
            .len(),
    });

    Chunk {
        strategy: tag,
        estimated_tokens: segments.iter().map(|s| s.tokens).sum(),
        segments,
        priority: 0,
        consolidation,
    }
}
