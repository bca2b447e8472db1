//! Result aggregation
//!
//! Folds per-item results into pass/fail counts, per-model statistics and
//! the overall pass predicate.

use crate::models::{ModelStats, RunSummary, TestResult};

/// Summarize `results` for the models in `model_ids`.
///
/// An empty result list yields a zero summary (vacuously passed) rather than
/// dividing by zero.
pub fn aggregate(results: &[TestResult], model_ids: &[String]) -> RunSummary {
    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();

    let model_results = model_ids
        .iter()
        .map(|model_id| {
            let (passed, total) = results
                .iter()
                .filter(|r| &r.model_id == model_id)
                .fold((0, 0), |(passed, total), r| {
                    (passed + usize::from(r.passed), total + 1)
                });
            (
                model_id.clone(),
                ModelStats {
                    passed,
                    failed: total - passed,
                    total,
                },
            )
        })
        .collect();

    let average_score = if total_tests == 0 {
        0.0
    } else {
        let sum: u64 = results.iter().map(|r| u64::from(r.evaluation.overall)).sum();
        round2(sum as f64 / total_tests as f64)
    };

    RunSummary {
        total_tests,
        passed_tests,
        failed_tests: total_tests - passed_tests,
        overall_passed: passed_tests == total_tests,
        average_score,
        model_results,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvaluationScore, TestCase, TokenUsage, WorkItem};

    fn result(case: &str, model: &str, overall: u8) -> TestResult {
        let item = WorkItem::new(TestCase::new(case), model);
        TestResult::new(
            &item,
            model,
            "output",
            EvaluationScore::uniform(overall, ""),
            10,
            TokenUsage::default(),
        )
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_aggregate_empty() {
        let summary = aggregate(&[], &ids(&["m1"]));
        assert_eq!(summary.total_tests, 0);
        assert_eq!(summary.passed_tests, 0);
        assert_eq!(summary.failed_tests, 0);
        assert!(summary.overall_passed);
        assert_eq!(summary.average_score, 0.0);
        assert_eq!(summary.model_results["m1"].total, 0);
    }

    #[test]
    fn test_aggregate_per_model() {
        let results = vec![
            result("tc1", "m1", 80),
            result("tc1", "m2", 25),
            result("tc2", "m1", 70),
            result("tc2", "m2", 90),
        ];
        let summary = aggregate(&results, &ids(&["m1", "m2"]));

        assert_eq!(summary.total_tests, 4);
        assert_eq!(summary.passed_tests, 3);
        assert_eq!(summary.failed_tests, 1);
        assert!(!summary.overall_passed);

        let m1 = summary.model_results["m1"];
        assert_eq!((m1.passed, m1.failed, m1.total), (2, 0, 2));
        let m2 = summary.model_results["m2"];
        assert_eq!((m2.passed, m2.failed, m2.total), (1, 1, 2));
    }

    #[test]
    fn test_average_rounded_to_two_places() {
        let results = vec![
            result("tc1", "m1", 70),
            result("tc2", "m1", 71),
            result("tc3", "m1", 71),
        ];
        let summary = aggregate(&results, &ids(&["m1"]));
        assert_eq!(summary.average_score, 70.67);
        assert!(summary.overall_passed);
    }

    #[test]
    fn test_unselected_model_counts_only_in_totals() {
        let results = vec![result("tc1", "m1", 90), result("tc1", "other", 10)];
        let summary = aggregate(&results, &ids(&["m1"]));

        assert_eq!(summary.total_tests, 2);
        assert_eq!(summary.model_results.len(), 1);
        assert_eq!(summary.model_results["m1"].total, 1);
    }
}
