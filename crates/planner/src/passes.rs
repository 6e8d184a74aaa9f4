use crate::config::PassConfig;
use crate::error::{PlannerError, Result};
use log::debug;
use review_chunker::Chunk;
use review_protocol::ReviewKind;
use review_tokens::estimate_output_tokens;
use serde::{Deserialize, Serialize};

/// One model invocation covering one or more chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pass {
    /// 0-based position in the plan
    pub index: usize,

    pub chunks: Vec<Chunk>,

    /// Tokens of the assigned chunks
    pub chunk_tokens: usize,

    /// Summary tokens carried over from earlier passes
    pub carried_tokens: usize,

    /// `chunk_tokens + carried_tokens`
    pub input_tokens: usize,

    /// Projected response size
    pub output_tokens: usize,

    /// Chunk tokens this pass may hold
    pub nominal_budget: usize,

    /// A single chunk larger than a fresh pass
    pub exceeds_nominal_budget: bool,
}

impl Pass {
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn total_tokens(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

/// Ordered assignment of chunks to passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassPlan {
    pub total_passes: usize,
    pub passes: Vec<Pass>,
    pub total_input_tokens: usize,
    pub total_output_tokens: usize,
    pub context_window: usize,
    pub carryover_fraction: f64,

    /// False when everything fits the first pass
    pub chunking_required: bool,
}

impl PassPlan {
    /// Plan with no passes, returned for empty input
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_passes: 0,
            passes: Vec::new(),
            total_input_tokens: 0,
            total_output_tokens: 0,
            context_window: 0,
            carryover_fraction: 0.0,
            chunking_required: false,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Indices of passes holding a chunk larger than a fresh pass
    #[must_use]
    pub fn oversized_passes(&self) -> Vec<usize> {
        self.passes
            .iter()
            .filter(|p| p.exceeds_nominal_budget)
            .map(|p| p.index)
            .collect()
    }

    /// All chunks in pass order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.passes.iter().flat_map(|p| &p.chunks)
    }
}

/// Assigns chunks to sequential passes under a context window.
///
/// Every pass holds back `max(carryover_fraction, safety margin)` of the window. From the
/// second pass on, part of the remaining space goes to the summary carried from earlier
/// passes, growing with the pass index. Chunks are assigned in order and never split.
#[derive(Debug, Clone)]
pub struct PassPlanner {
    config: PassConfig,
    kind: ReviewKind,
    max_output_tokens: Option<usize>,
    min_margin: f64,
}

impl PassPlanner {
    pub fn new(config: PassConfig, kind: ReviewKind) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            kind,
            max_output_tokens: None,
            min_margin: 0.0,
        })
    }

    /// Cap projected output at the model's response limit
    #[must_use]
    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<usize>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Raise the reserve to at least `margin` (the token counter's under-count margin)
    #[must_use]
    pub fn with_min_margin(mut self, margin: f64) -> Self {
        self.min_margin = margin.clamp(0.0, 0.99);
        self
    }

    pub fn config(&self) -> &PassConfig {
        &self.config
    }

    pub fn review_kind(&self) -> ReviewKind {
        self.kind
    }

    /// Fraction of the window held back on every pass
    #[must_use]
    pub fn reserve(&self, carryover_fraction: f64) -> f64 {
        carryover_fraction
            .max(self.config.safety_margin)
            .max(self.min_margin)
    }

    /// Summary tokens carried into pass `index`
    #[must_use]
    pub fn carried_tokens(&self, index: usize) -> usize {
        if index == 0 {
            return 0;
        }
        self.config
            .carryover_base_tokens
            .saturating_add(self.config.carryover_tokens_per_pass.saturating_mul(index))
    }

    /// Chunk tokens pass `index` may hold, never below one
    #[must_use]
    pub fn nominal_budget(
        &self,
        context_window: usize,
        carryover_fraction: f64,
        index: usize,
    ) -> usize {
        let base =
            (context_window as f64 * (1.0 - self.reserve(carryover_fraction))).floor() as usize;
        base.saturating_sub(self.carried_tokens(index)).max(1)
    }

    /// Assign `chunks` in order to the fewest order-preserving passes.
    ///
    /// A chunk that overflows the current pass opens the next one. A chunk larger than a
    /// fresh pass's budget gets a pass of its own, flagged `exceeds_nominal_budget`.
    pub fn plan_passes(
        &self,
        chunks: &[Chunk],
        context_window: usize,
        carryover_fraction: f64,
    ) -> Result<PassPlan> {
        if context_window == 0 {
            return Err(PlannerError::invalid_config("context_window must be > 0"));
        }
        if !(0.0..1.0).contains(&carryover_fraction) {
            return Err(PlannerError::invalid_config(format!(
                "carryover_fraction must be in [0, 1), got {carryover_fraction}"
            )));
        }
        if chunks.is_empty() {
            return Ok(PassPlan::empty());
        }

        let budget = |index: usize| self.nominal_budget(context_window, carryover_fraction, index);

        let mut passes: Vec<Pass> = Vec::new();
        let mut current: Vec<Chunk> = Vec::new();
        let mut used = 0usize;

        for chunk in chunks {
            let tokens = chunk.estimated_tokens;

            if !current.is_empty() && used + tokens > budget(passes.len()) {
                let index = passes.len();
                passes.push(self.close(index, std::mem::take(&mut current), budget(index)));
                used = 0;
            }

            let index = passes.len();
            if current.is_empty() && tokens > budget(index) {
                debug!(
                    "Chunk {} ({tokens} tokens) exceeds pass {index} budget {}; assigned alone",
                    chunk.priority,
                    budget(index)
                );
                passes.push(self.close(index, vec![chunk.clone()], budget(index)));
                continue;
            }

            current.push(chunk.clone());
            used += tokens;
        }

        if !current.is_empty() {
            let index = passes.len();
            passes.push(self.close(index, current, budget(index)));
        }

        let total_chunk_tokens: usize = chunks.iter().map(|c| c.estimated_tokens).sum();
        let plan = PassPlan {
            total_passes: passes.len(),
            total_input_tokens: passes.iter().map(|p| p.input_tokens).sum(),
            total_output_tokens: passes.iter().map(|p| p.output_tokens).sum(),
            chunking_required: total_chunk_tokens > budget(0),
            passes,
            context_window,
            carryover_fraction,
        };

        debug!(
            "Planned {} chunks into {} passes (window {context_window}, reserve {:.2})",
            chunks.len(),
            plan.total_passes,
            self.reserve(carryover_fraction)
        );

        Ok(plan)
    }

    fn close(&self, index: usize, chunks: Vec<Chunk>, nominal_budget: usize) -> Pass {
        let chunk_tokens: usize = chunks.iter().map(|c| c.estimated_tokens).sum();
        let carried_tokens = self.carried_tokens(index);
        let input_tokens = chunk_tokens + carried_tokens;

        let mut output_tokens = estimate_output_tokens(input_tokens, self.kind);
        if let Some(cap) = self.max_output_tokens {
            output_tokens = output_tokens.min(cap);
        }

        Pass {
            index,
            chunks,
            chunk_tokens,
            carried_tokens,
            input_tokens,
            output_tokens,
            nominal_budget,
            exceeds_nominal_budget: chunk_tokens > nominal_budget,
        }
    }
}
