//! Finalizer behavior over whole runs

use super::*;
use crate::config::ProbabilityPolicy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

fn runs(value: Value) -> Vec<SyntheticRun> {
    serde_json::from_value(value).unwrap()
}

/// A single-run batch with `n` identical parameterized records
fn repeated(params: Value, family: &str, n: usize) -> Vec<SyntheticRun> {
    let data: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "A": i,
                "C": params.clone(),
                "C分布类型": family,
                "id": i + 1
            })
        })
        .collect();
    runs(json!([{
        "variables": ["A"],
        "confounder_variables": ["C"],
        "data": data
    }]))
}

fn drawn_values(outcome: &FinalizeOutcome) -> Vec<Value> {
    outcome.runs[0]
        .data
        .iter()
        .map(|r| r.get("C").cloned().unwrap())
        .collect()
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn std_dev(xs: &[f64]) -> f64 {
    let m = mean(xs);
    (xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64).sqrt()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_end_to_end_single_record() {
    let input = runs(json!([{
        "variables": ["A", "B"],
        "confounder_variables": ["C"],
        "data": [{"A": "x", "B": "y", "C": {"mean": 0, "std": 1}, "C分布类型": "正态分布", "id": 1}]
    }]));

    let outcome = Finalizer::default().finalize(&input);
    let record = &outcome.runs[0].data[0];

    assert!(record.get("C").unwrap().is_f64());
    assert!(!record.contains_key("C分布类型"));
    assert_eq!(record.get("A"), Some(&json!("x")));
    assert_eq!(record.get("B"), Some(&json!("y")));
    assert_eq!(record.get("id"), Some(&json!(1)));
    assert_eq!(outcome.report.records_resolved, 1);
    assert!(outcome.report.is_clean());
    assert!(outcome.report.diagnostics.is_empty());
}

#[test]
fn test_key_order_preserved() {
    let input = runs(json!([{
        "variables": ["A", "B"],
        "confounder_variables": ["C"],
        "data": [{"A": 1, "C": {"p": 1.0}, "C分布类型": "bernoulli", "B": 2, "id": 1}]
    }]));

    let outcome = Finalizer::default().finalize(&input);
    let keys: Vec<&str> = outcome.runs[0].data[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["A", "C", "B", "id"]);
    assert_eq!(outcome.runs[0].data[0].get("C"), Some(&json!(1)));
}

#[test]
fn test_scalar_records_are_untouched() {
    let input = runs(json!([{
        "variables": ["A", "B"],
        "confounder_variables": ["C"],
        "data": [
            {"A": 1, "B": 2, "C": 0.25, "id": 1},
            {"A": 3, "B": 4, "C": "high", "id": 2},
            {"A": 5, "B": 6, "id": 3}
        ]
    }]));

    let outcome = Finalizer::default().finalize(&input);
    assert_eq!(outcome.runs, input);
    assert_eq!(outcome.report.records_passed_through, 3);
    assert!(outcome.report.diagnostics.is_empty());
}

#[test]
fn test_input_is_not_mutated() {
    let input = repeated(json!({"mean": 1, "std": 1}), "normal", 3);
    let snapshot = input.clone();

    let outcome = Finalizer::default().finalize(&input);
    assert_eq!(input, snapshot);
    assert_ne!(outcome.runs, input);
}

#[test]
fn test_negative_std_is_corrected() {
    let input = repeated(json!({"mean": 5, "std": -2}), "normal", 10_000);
    let mut rng = StdRng::seed_from_u64(42);

    let outcome = Finalizer::default().finalize_with_rng(&input, &mut rng);
    let xs: Vec<f64> = drawn_values(&outcome)
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();

    assert!((mean(&xs) - 5.0).abs() < 0.1, "mean {}", mean(&xs));
    assert!((std_dev(&xs) - 2.0).abs() < 0.1, "std {}", std_dev(&xs));
    assert_eq!(outcome.report.records_resolved, 10_000);
    assert_eq!(outcome.report.diagnostics.len(), 10_000);
    assert!(outcome.report.diagnostics.iter().all(|d| matches!(
        d.kind,
        DiagnosticKind::Corrected {
            correction: Correction::NegativeStd { original }
        } if original == -2.0
    )));
    assert_eq!(outcome.report.failure_count(), 0);
}

#[test]
fn test_bernoulli_empirical_mean() {
    let input = repeated(json!({"p": 0.3}), "伯努利分布", 10_000);
    let mut rng = StdRng::seed_from_u64(7);

    let outcome = Finalizer::default().finalize_with_rng(&input, &mut rng);
    let xs: Vec<f64> = drawn_values(&outcome)
        .iter()
        .map(|v| {
            let x = v.as_u64().unwrap();
            assert!(x <= 1);
            x as f64
        })
        .collect();

    assert!((mean(&xs) - 0.3).abs() < 0.02, "mean {}", mean(&xs));
}

#[test]
fn test_categorical_empirical_frequency() {
    let input = repeated(
        json!({"categories": ["A", "B"], "probabilities": [0.9, 0.1]}),
        "Categorical",
        10_000,
    );
    let mut rng = StdRng::seed_from_u64(3);

    let outcome = Finalizer::default().finalize_with_rng(&input, &mut rng);
    let values = drawn_values(&outcome);

    assert!(values.iter().all(|v| *v == json!("A") || *v == json!("B")));
    let freq_a = values.iter().filter(|v| **v == json!("A")).count() as f64 / values.len() as f64;
    assert!((freq_a - 0.9).abs() < 0.02, "freq {freq_a}");
}

#[test]
fn test_uniform_draws_within_bounds() {
    let input = repeated(json!({"low": -1.0, "high": 1.0}), "均匀分布", 1_000);
    let outcome = Finalizer::default().finalize(&input);

    for value in drawn_values(&outcome) {
        let x = value.as_f64().unwrap();
        assert!((-1.0..1.0).contains(&x));
    }
}

#[test]
fn test_draws_are_independent_per_record() {
    let input = repeated(json!({"mean": 0, "std": 1}), "normal", 100);
    let outcome = Finalizer::new(FinalizeConfig::default().with_seed(1)).finalize(&input);

    let values = drawn_values(&outcome);
    let first = &values[0];
    assert!(values.iter().skip(1).any(|v| v != first));
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let input = repeated(json!({"mean": 0, "std": 1}), "normal", 20);
    let finalizer = Finalizer::new(FinalizeConfig::default().with_seed(99));

    assert_eq!(finalizer.finalize(&input).runs, finalizer.finalize(&input).runs);
}

#[test]
fn test_unknown_family_left_unresolved() {
    let input = runs(json!([{
        "variables": ["A"],
        "confounder_variables": ["C"],
        "data": [{"A": 1, "C": {"lambda": 4}, "C分布类型": "poisson", "id": 1}]
    }]));

    let outcome = Finalizer::default().finalize(&input);
    let record = &outcome.runs[0].data[0];

    assert_eq!(record.get("C"), Some(&json!({"lambda": 4})));
    assert_eq!(record.get("C分布类型"), Some(&json!("poisson")));
    assert_eq!(outcome.report.records_unresolved, 1);
    assert_eq!(outcome.report.diagnostics.len(), 1);

    let diagnostic = &outcome.report.diagnostics[0];
    assert_eq!(diagnostic.run, 0);
    assert_eq!(diagnostic.record, 0);
    assert_eq!(diagnostic.confounder, "C");
    match &diagnostic.kind {
        DiagnosticKind::Unresolved {
            family,
            error,
            params,
        } => {
            assert_eq!(family.as_deref(), Some("poisson"));
            assert_eq!(*error, ResolveError::UnknownFamily("poisson".to_string()));
            assert_eq!(*params, json!({"lambda": 4}));
        }
        other => panic!("expected unresolved, got {other:?}"),
    }
    assert!(diagnostic.to_string().contains("poisson"));
}

#[test]
fn test_failures_do_not_stop_the_batch() {
    let input = runs(json!([
        {
            "variables": ["A"],
            "confounder_variables": ["C"],
            "data": [
                {"A": 1, "C": {"categories": ["x"]}, "C分布类型": "分类分布", "id": 1},
                {"A": 2, "C": {"p": 0.5}, "C分布类型": "bernoulli", "id": 2}
            ]
        },
        {
            "variables": ["A"],
            "confounder_variables": ["D"],
            "data": [{"A": 3, "D": {"low": 0, "high": 1}, "D分布类型": "uniform", "id": 1}]
        }
    ]));

    let outcome = Finalizer::default().finalize(&input);
    assert_eq!(outcome.runs.len(), 2);
    assert_eq!(outcome.report.runs_processed, 2);
    assert_eq!(outcome.report.records_unresolved, 1);
    assert_eq!(outcome.report.records_resolved, 2);
    assert!(outcome.runs[0].data[0].get("C").unwrap().is_object());
    assert!(outcome.runs[0].data[1].get("C").unwrap().is_u64());
    assert!(outcome.runs[1].data[0].get("D").unwrap().is_f64());
}

#[test]
fn test_mapping_without_family_is_flagged() {
    let input = runs(json!([{
        "variables": ["A"],
        "confounder_variables": ["C"],
        "data": [{"A": 1, "C": {"mean": 0, "std": 1}, "id": 1}]
    }]));

    let outcome = Finalizer::default().finalize(&input);
    assert_eq!(outcome.runs, input);
    assert_eq!(outcome.report.records_unresolved, 1);
    assert!(matches!(
        outcome.report.diagnostics[0].kind,
        DiagnosticKind::Unresolved {
            family: None,
            error: ResolveError::MissingDistributionType,
            ..
        }
    ));
}

#[test]
fn test_run_without_confounder_is_copied() {
    let input = runs(json!([{
        "variables": ["A"],
        "confounder_variables": [],
        "data": [{"A": 1, "C": {"mean": 0}, "C分布类型": "normal"}]
    }]));

    let outcome = Finalizer::default().finalize(&input);
    assert_eq!(outcome.runs, input);
    assert_eq!(outcome.report.runs_skipped, 1);
    assert_eq!(outcome.report.runs_processed, 0);
}

#[test]
fn test_only_first_confounder_is_resolved() {
    let input = runs(json!([{
        "variables": ["A"],
        "confounder_variables": ["C", "D"],
        "data": [{
            "A": 1,
            "C": {"p": 0.0}, "C分布类型": "bernoulli",
            "D": {"p": 1.0}, "D分布类型": "bernoulli"
        }]
    }]));

    let outcome = Finalizer::default().finalize(&input);
    let record = &outcome.runs[0].data[0];
    assert_eq!(record.get("C"), Some(&json!(0)));
    assert!(record.get("D").unwrap().is_object());
    assert!(record.contains_key("D分布类型"));
}

#[test]
fn test_second_pass_is_idempotent() {
    let input = runs(json!([{
        "variables": ["A", "B"],
        "confounder_variables": ["C"],
        "data": [
            {"A": 1, "B": 2, "C": {"mean": 0, "std": 1}, "C分布类型": "normal", "id": 1},
            {"A": 3, "B": 4, "C": {"categories": ["lo", "hi"], "probabilities": [0.5, 0.5]}, "C分布类型": "categorical", "id": 2},
            {"A": 5, "B": 6, "C": {"p": 0.2}, "C分布类型": "bernoulli", "id": 3}
        ]
    }]));
    let finalizer = Finalizer::default();

    let first = finalizer.finalize(&input);
    let second = finalizer.finalize(&first.runs);

    assert_eq!(second.runs, first.runs);
    assert_eq!(second.report.records_resolved, 0);
    assert_eq!(second.report.records_passed_through, 3);
}

#[test]
fn test_normalize_policy_reports_correction() {
    let input = repeated(
        json!({"categories": ["A", "B"], "probabilities": [0.5, 0.6]}),
        "categorical",
        1,
    );

    let strict = Finalizer::default().finalize(&input);
    assert_eq!(strict.report.records_unresolved, 1);

    let lenient = Finalizer::new(
        FinalizeConfig::default().with_probability_policy(ProbabilityPolicy::Normalize),
    )
    .finalize(&input);
    assert_eq!(lenient.report.records_resolved, 1);
    assert!(matches!(
        lenient.report.diagnostics[0].kind,
        DiagnosticKind::Corrected {
            correction: Correction::ProbabilitiesNormalized { .. }
        }
    ));
}

#[test]
fn test_report_serializes_diagnostics() {
    let input = repeated(json!({}), "poisson", 1);
    let outcome = Finalizer::default().finalize(&input);

    let json = serde_json::to_value(&outcome.report).unwrap();
    assert_eq!(json["records_unresolved"], json!(1));
    assert_eq!(json["diagnostics"][0]["kind"]["type"], json!("unresolved"));
    assert_eq!(
        json["diagnostics"][0]["kind"]["error"],
        json!("unknown distribution type 'poisson'")
    );
}

#[test]
fn test_mapping_label_is_not_a_draw() {
    let input = repeated(
        json!({"categories": [{"mean": 0}], "probabilities": [1.0]}),
        "categorical",
        1,
    );
    let outcome = Finalizer::default().finalize(&input);

    assert_eq!(outcome.runs, input);
    assert_eq!(outcome.report.records_resolved, 0);
    assert_eq!(outcome.report.records_unresolved, 1);
    assert!(!outcome.report.is_clean());
    assert!(matches!(
        outcome.report.diagnostics[0].kind,
        DiagnosticKind::Unresolved {
            error: ResolveError::NonScalarCategory(_),
            ..
        }
    ));
}

#[test]
fn test_overflowing_draws_stay_unresolved() {
    let input = repeated(json!({"mean": 1.7e308, "std": 1e308}), "normal", 50);
    let mut rng = StdRng::seed_from_u64(42);
    let outcome = Finalizer::default().finalize_with_rng(&input, &mut rng);
    let report = &outcome.report;

    assert_eq!(report.records_resolved + report.records_unresolved, 50);
    assert!(report.records_unresolved > 0);
    assert_eq!(report.failure_count(), report.records_unresolved);

    for (record, original) in outcome.runs[0].data.iter().zip(&input[0].data) {
        let value = &record["C"];
        assert!(!value.is_null());
        if value.is_object() {
            assert_eq!(record, original);
        } else {
            assert!(value.as_f64().is_some_and(f64::is_finite));
            assert!(record.get("C分布类型").is_none());
        }
    }
    assert!(report.diagnostics.iter().all(|d| matches!(
        d.kind,
        DiagnosticKind::Unresolved {
            error: ResolveError::NonFiniteDraw(_),
            ..
        }
    )));
}
