//! Combination planning
//!
//! Expands test cases x models into the ordered work item list.

use crate::models::{TestCase, WorkItem};

/// Outer loop over test cases, inner loop over models, both in given order
pub fn plan(test_cases: &[TestCase], model_ids: &[String]) -> Vec<WorkItem> {
    test_cases
        .iter()
        .flat_map(|case| {
            model_ids
                .iter()
                .map(move |model_id| WorkItem::new(case.clone(), model_id.clone()))
        })
        .collect()
}

/// 1-based test case number for a flattened result index
pub fn test_case_number(index: usize, model_count: usize) -> usize {
    index / model_count.max(1) + 1
}
