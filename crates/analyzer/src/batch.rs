use crate::analyzer::StructuralAnalyzer;
use crate::cache::{AnalysisCache, CacheKey};
use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, Result};
use crate::types::{AnalysisResult, SourceUnit};
use rayon::prelude::*;
use review_tokens::TokenCounter;
use std::sync::Arc;

/// Analyze `units` in parallel, preserving input order.
///
/// With a cache, hits are served first and only misses reach the worker pool; fresh
/// results are stored back afterwards. If the pool cannot be built the misses are
/// analyzed sequentially.
pub fn analyze_all(
    units: &[SourceUnit],
    config: &AnalyzerConfig,
    counter: &TokenCounter,
    mut cache: Option<&mut AnalysisCache>,
) -> Result<Vec<Arc<AnalysisResult>>> {
    config.validate()?;

    let fingerprint = format!("{};tokens={}", config.fingerprint(), counter.fingerprint());

    let mut slots: Vec<Option<Arc<AnalysisResult>>> = vec![None; units.len()];
    let mut pending: Vec<(usize, CacheKey)> = Vec::new();

    for (index, unit) in units.iter().enumerate() {
        let key = CacheKey::new(unit, fingerprint.as_str());
        match cache.as_deref_mut().and_then(|cache| cache.get(&key)) {
            Some(hit) => slots[index] = Some(hit),
            None => pending.push((index, key)),
        }
    }

    let misses: Vec<&SourceUnit> = pending.iter().map(|(index, _)| &units[*index]).collect();
    let fresh = analyze_misses(&misses, config, counter)?;

    for ((index, key), result) in pending.into_iter().zip(fresh) {
        let result = Arc::new(result);
        if let Some(cache) = cache.as_deref_mut() {
            cache.insert(key, Arc::clone(&result));
        }
        slots[index] = Some(result);
    }

    let cached = units.len() - misses.len();
    log::info!(
        "Analyzed {} units ({} from cache, {} parsed)",
        units.len(),
        cached,
        misses.len()
    );

    Ok(slots.into_iter().flatten().collect())
}

fn analyze_misses(
    units: &[&SourceUnit],
    config: &AnalyzerConfig,
    counter: &TokenCounter,
) -> Result<Vec<AnalysisResult>> {
    if units.len() <= 1 {
        return analyze_sequential(units, config, counter);
    }

    let workers = config.worker_count().min(units.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build();

    match pool {
        Ok(pool) => pool.install(|| {
            units
                .par_iter()
                .map_init(
                    || StructuralAnalyzer::new(config.clone(), counter.clone()),
                    |analyzer, unit| match analyzer {
                        Ok(analyzer) => Ok(analyzer.analyze(unit)),
                        Err(err) => Err(AnalyzerError::tree_sitter(err.to_string())),
                    },
                )
                .collect()
        }),
        Err(err) => {
            log::warn!("Failed to build analysis pool ({err}), analyzing sequentially");
            analyze_sequential(units, config, counter)
        }
    }
}

fn analyze_sequential(
    units: &[&SourceUnit],
    config: &AnalyzerConfig,
    counter: &TokenCounter,
) -> Result<Vec<AnalysisResult>> {
    if units.is_empty() {
        return Ok(Vec::new());
    }
    let mut analyzer = StructuralAnalyzer::new(config.clone(), counter.clone())?;
    Ok(units.iter().map(|unit| analyzer.analyze(unit)).collect())
}
