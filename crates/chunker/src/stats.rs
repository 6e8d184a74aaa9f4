use crate::types::{Chunk, ChunkingRecommendation};
use std::collections::BTreeSet;

/// Summary of a chunking recommendation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_segments: usize,
    pub total_files: usize,
    pub degraded_files: usize,
    pub total_tokens: usize,
    pub avg_tokens_per_chunk: usize,
    pub max_tokens: usize,
    /// Chunks larger than the budget
    pub oversized_chunks: usize,
}

impl ChunkingStats {
    #[must_use]
    pub fn from_recommendation(recommendation: &ChunkingRecommendation) -> Self {
        let chunks = &recommendation.chunks;
        let total_tokens: usize = chunks.iter().map(|c| c.estimated_tokens).sum();

        Self {
            total_chunks: chunks.len(),
            total_segments: chunks.iter().map(|c| c.segments.len()).sum(),
            total_files: chunks
                .iter()
                .flat_map(Chunk::files)
                .collect::<BTreeSet<_>>()
                .len(),
            degraded_files: recommendation.degradations.len(),
            total_tokens,
            avg_tokens_per_chunk: if chunks.is_empty() {
                0
            } else {
                total_tokens / chunks.len()
            },
            max_tokens: chunks.iter().map(|c| c.estimated_tokens).max().unwrap_or(0),
            oversized_chunks: chunks
                .iter()
                .filter(|c| c.estimated_tokens > recommendation.budget_tokens)
                .count(),
        }
    }
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Segments: {} | Files: {} | Tokens: {} | Avg: {} | Max: {} | Oversized: {} | Degraded: {}",
            self.total_chunks,
            self.total_segments,
            self.total_files,
            self.total_tokens,
            self.avg_tokens_per_chunk,
            self.max_tokens,
            self.oversized_chunks,
            self.degraded_files
        )
    }
}
