use review_analyzer::{
    analyze_all, AnalysisCache, AnalyzerConfig, FallbackReason, SourceUnit, StructuralAnalyzer,
};
use review_tokens::{EstimatorConfig, TokenCounter, TokenEstimator};
use std::sync::Arc;

fn units() -> Vec<SourceUnit> {
    vec![
        SourceUnit::new("src/lib.rs", "pub mod shapes;\npub fn area(w: u32, h: u32) -> u32 { w * h }\n"),
        SourceUnit::new("app.py", "def main():\n    return 0\n"),
        SourceUnit::new("config.json", "{\"debug\": true}\n"),
        SourceUnit::new("web/index.ts", "export function render(): string { return \"ok\"; }\n"),
        SourceUnit::new("broken.py", "def broken(:\n"),
    ]
}

#[test]
fn results_follow_input_order() {
    let units = units();
    let results = analyze_all(&units, &AnalyzerConfig::default(), &TokenCounter::default(), None)
        .expect("analysis failed");

    let paths: Vec<_> = results.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["src/lib.rs", "app.py", "config.json", "web/index.ts", "broken.py"]
    );

    let structural: Vec<_> = results.iter().map(|r| r.structural).collect();
    assert_eq!(structural, vec![true, true, false, true, false]);
    assert_eq!(results[2].fallback, Some(FallbackReason::UnsupportedLanguage));
    assert_eq!(results[4].fallback, Some(FallbackReason::ParseFailure));
}

#[test]
fn parallel_matches_sequential() {
    let units = units();
    let counter = TokenCounter::default();

    let parallel = analyze_all(
        &units,
        &AnalyzerConfig {
            max_workers: Some(4),
            ..Default::default()
        },
        &counter,
        None,
    )
    .unwrap();

    let mut analyzer = StructuralAnalyzer::new(AnalyzerConfig::sequential(), counter).unwrap();
    for (unit, result) in units.iter().zip(&parallel) {
        assert_eq!(&analyzer.analyze(unit), &**result);
    }
}

#[test]
fn cache_serves_unchanged_units() {
    let mut units = units();
    let config = AnalyzerConfig::default();
    let counter = TokenCounter::default();
    let mut cache = AnalysisCache::new(16);

    let first = analyze_all(&units, &config, &counter, Some(&mut cache)).unwrap();
    assert_eq!(cache.hits(), 0);
    assert_eq!(cache.misses(), 5);
    assert_eq!(cache.len(), 5);

    units[1].content.push_str("\ndef extra():\n    pass\n");
    let second = analyze_all(&units, &config, &counter, Some(&mut cache)).unwrap();

    assert_eq!(cache.hits(), 4);
    assert_eq!(cache.misses(), 6);
    assert!(Arc::ptr_eq(&first[0], &second[0]));
    assert!(!Arc::ptr_eq(&first[1], &second[1]));
    assert_eq!(second[1].declarations.len(), 2);
}

#[test]
fn changed_settings_miss_the_cache() {
    let units = units();
    let counter = TokenCounter::default();
    let mut cache = AnalysisCache::default();

    analyze_all(&units, &AnalyzerConfig::default(), &counter, Some(&mut cache)).unwrap();
    let tight = AnalyzerConfig {
        max_file_bytes: 20,
        ..Default::default()
    };
    let results = analyze_all(&units, &tight, &counter, Some(&mut cache)).unwrap();

    assert_eq!(cache.hits(), 0);
    assert_eq!(results[0].fallback, Some(FallbackReason::FileTooLarge));
}

fn ratio_counter(chars_per_token: f64) -> TokenCounter {
    TokenEstimator::new(EstimatorConfig {
        fallback_chars_per_token: chars_per_token,
        ..Default::default()
    })
    .unwrap()
    .counter("default")
}

#[test]
fn changed_token_ratio_misses_the_cache() {
    let units = vec![SourceUnit::new("notes.txt", "a".repeat(40))];
    let config = AnalyzerConfig::default();
    let mut cache = AnalysisCache::default();

    let four = analyze_all(&units, &config, &ratio_counter(4.0), Some(&mut cache)).unwrap();
    let two = analyze_all(&units, &config, &ratio_counter(2.0), Some(&mut cache)).unwrap();
    let again = analyze_all(&units, &config, &ratio_counter(2.0), Some(&mut cache)).unwrap();

    assert_eq!(four[0].estimated_tokens, 10);
    assert_eq!(two[0].estimated_tokens, 20);
    assert_eq!(again[0].estimated_tokens, 20);
    assert_eq!(cache.hits(), 1);
}

#[test]
fn empty_input() {
    let results =
        analyze_all(&[], &AnalyzerConfig::default(), &TokenCounter::default(), None).unwrap();
    assert!(results.is_empty());
}

#[test]
fn invalid_config_is_rejected() {
    let config = AnalyzerConfig {
        max_workers: Some(0),
        ..Default::default()
    };
    assert!(analyze_all(&units(), &config, &TokenCounter::default(), None).is_err());
}
