use review_protocol::ReviewKind;

/// Smallest response a review pass produces for non-empty input
pub const MIN_OUTPUT_TOKENS: usize = 256;

/// Output/input ratio observed per review kind.
///
/// Only used to project cost; chunk sizing never depends on it.
#[must_use]
pub const fn output_multiplier(kind: ReviewKind) -> f64 {
    match kind {
        ReviewKind::QuickFixes => 0.10,
        ReviewKind::Evaluation => 0.12,
        ReviewKind::UnusedCode => 0.15,
        ReviewKind::BestPractices => 0.18,
        ReviewKind::Security | ReviewKind::Performance => 0.20,
        ReviewKind::Architectural => 0.25,
        ReviewKind::ExtractPatterns | ReviewKind::Comprehensive => 0.30,
    }
}

/// Expected output tokens for a pass with `input_tokens` of input
#[must_use]
pub fn estimate_output_tokens(input_tokens: usize, kind: ReviewKind) -> usize {
    if input_tokens == 0 {
        return 0;
    }
    let projected = (input_tokens as f64 * output_multiplier(kind)).ceil() as usize;
    projected.max(MIN_OUTPUT_TOKENS)
}
