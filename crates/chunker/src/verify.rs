//! Coverage verification: the segments of a plan must tile every input file exactly.

use crate::types::Chunk;
use std::fmt;

/// First coverage defect found in a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CoverageError {
    UnknownFile(usize),
    Missing { file: usize },
    Gap { file: usize, at: usize },
    Overlap { file: usize, at: usize },
    EmptySegment { file: usize, at: usize },
    Truncated { file: usize, covered: usize, len: usize },
    SplitDeclaration { file: usize, start: usize, end: usize },
}

impl fmt::Display for CoverageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFile(file) => write!(f, "segment refers to unknown file #{file}"),
            Self::Missing { file } => write!(f, "file #{file} is not covered"),
            Self::Gap { file, at } => write!(f, "gap in file #{file} at byte {at}"),
            Self::Overlap { file, at } => write!(f, "overlap in file #{file} at byte {at}"),
            Self::EmptySegment { file, at } => {
                write!(f, "empty segment in file #{file} at byte {at}")
            }
            Self::Truncated { file, covered, len } => {
                write!(f, "file #{file} covered up to byte {covered} of {len}")
            }
            Self::SplitDeclaration { file, start, end } => write!(
                f,
                "declaration at bytes {start}..{end} of file #{file} crosses a segment boundary"
            ),
        }
    }
}

/// Check that `chunks` cover files of `lengths` exactly.
///
/// Coverage is a tiling of each file: its segments, sorted by offset wherever they sit,
/// must run from byte 0 to the end without gap or overlap. Chunk order plays no part,
/// so a chunk may hold a later part of a file than the chunk after it (a caller placed
/// with its callee). Concatenating the chunks in order need not reproduce any file.
///
/// `protected[i]` lists byte spans of file `i` that must sit inside a single segment.
pub(crate) fn verify_coverage(
    chunks: &[Chunk],
    lengths: &[usize],
    protected: &[Vec<(usize, usize)>],
) -> Result<(), CoverageError> {
    let mut spans: Vec<Vec<(usize, usize)>> = vec![Vec::new(); lengths.len()];
    for segment in chunks.iter().flat_map(|c| &c.segments) {
        spans
            .get_mut(segment.file_index)
            .ok_or(CoverageError::UnknownFile(segment.file_index))?
            .push((segment.start_byte, segment.end_byte));
    }

    for (file, (mut file_spans, &len)) in spans.into_iter().zip(lengths).enumerate() {
        if file_spans.is_empty() {
            return Err(CoverageError::Missing { file });
        }
        file_spans.sort_unstable();

        // an empty file is carried by exactly one empty segment
        if len == 0 {
            match file_spans.as_slice() {
                [(0, 0)] => continue,
                [(0, 0), ..] => return Err(CoverageError::Overlap { file, at: 0 }),
                _ => {
                    return Err(CoverageError::Truncated {
                        file,
                        covered: file_spans.last().map_or(0, |&(_, end)| end),
                        len,
                    })
                }
            }
        }

        let mut cursor = 0;
        for &(start, end) in &file_spans {
            if start > cursor {
                return Err(CoverageError::Gap { file, at: cursor });
            }
            if start < cursor {
                return Err(CoverageError::Overlap { file, at: start });
            }
            if end <= start {
                return Err(CoverageError::EmptySegment { file, at: start });
            }
            cursor = end;
        }
        if cursor != len {
            return Err(CoverageError::Truncated {
                file,
                covered: cursor,
                len,
            });
        }

        if let Some(declarations) = protected.get(file) {
            for &(start, end) in declarations {
                if end <= start {
                    continue;
                }
                let holder = file_spans.partition_point(|&(s, _)| s <= start);
                let inside = holder
                    .checked_sub(1)
                    .is_some_and(|i| file_spans[i].1 >= end);
                if !inside {
                    return Err(CoverageError::SplitDeclaration { file, start, end });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkingStrategy, Segment, SegmentKind};

    fn chunk(spans: &[(usize, usize, usize)]) -> Chunk {
        Chunk {
            strategy: ChunkingStrategy::LineBased,
            segments: spans
                .iter()
                .map(|&(file_index, start_byte, end_byte)| Segment {
                    file_index,
                    path: format!("f{file_index}"),
                    start_byte,
                    end_byte,
                    start_line: 1,
                    end_line: 1,
                    kind: SegmentKind::Lines,
                    tokens: 0,
                })
                .collect(),
            estimated_tokens: 0,
            priority: 0,
            consolidation: None,
        }
    }

    #[test]
    fn test_tiling_ignores_chunk_order() {
        let chunks = vec![chunk(&[(0, 50, 100), (1, 0, 0)]), chunk(&[(0, 0, 50)])];
        assert_eq!(verify_coverage(&chunks, &[100, 0], &[]), Ok(()));
    }

    #[test]
    fn test_defects_are_reported() {
        let lengths = [100];
        assert_eq!(
            verify_coverage(&[chunk(&[(0, 0, 40), (0, 50, 100)])], &lengths, &[]),
            Err(CoverageError::Gap { file: 0, at: 40 })
        );
        assert_eq!(
            verify_coverage(&[chunk(&[(0, 0, 60)]), chunk(&[(0, 50, 100)])], &lengths, &[]),
            Err(CoverageError::Overlap { file: 0, at: 50 })
        );
        assert_eq!(
            verify_coverage(&[chunk(&[(0, 0, 90)])], &lengths, &[]),
            Err(CoverageError::Truncated {
                file: 0,
                covered: 90,
                len: 100
            })
        );
        assert_eq!(
            verify_coverage(&[chunk(&[(0, 0, 100)])], &[100, 10], &[]),
            Err(CoverageError::Missing { file: 1 })
        );
        assert_eq!(
            verify_coverage(&[chunk(&[(3, 0, 100)])], &lengths, &[]),
            Err(CoverageError::UnknownFile(3))
        );
        assert_eq!(
            verify_coverage(&[chunk(&[(0, 0, 100)]), chunk(&[(0, 0, 100)])], &lengths, &[]),
            Err(CoverageError::Overlap { file: 0, at: 0 })
        );
    }

    #[test]
    fn test_split_declaration_is_rejected() {
        let chunks = vec![chunk(&[(0, 0, 40)]), chunk(&[(0, 40, 100)])];
        assert_eq!(
            verify_coverage(&chunks, &[100], &[vec![(10, 40), (45, 90)]]),
            Ok(())
        );
        assert_eq!(
            verify_coverage(&chunks, &[100], &[vec![(30, 60)]]),
            Err(CoverageError::SplitDeclaration {
                file: 0,
                start: 30,
                end: 60
            })
        );
    }
}
