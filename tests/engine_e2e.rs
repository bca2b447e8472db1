//! End-to-end runs of the engine against in-memory providers

use std::sync::Arc;
use std::time::Duration;

use prompt_autotest::client::fakes::{FixedScorer, ScriptedClient};
use prompt_autotest::client::ProviderError;
use prompt_autotest::executor::{
    AutoTestRunner, EngineError, RunConfig, RunRequest, SchedulerConfig,
};
use prompt_autotest::models::{EvaluationScore, ModelInfo, RunState, VariableSpec};
use prompt_autotest::synth::SampleTable;

const SYNTHESIZED: &str = r#"Sure! Here you go:
```json
{"testCases": [
  {"id": "tc_1", "input": {"topic": "tides"}, "expectedOutput": "Mentions the moon", "description": "basic"},
  {"id": "tc_2", "input": {"topic": "volcanoes"}, "expectedOutput": "Explains magma", "description": "science"}
]}
```"#;

fn models() -> Vec<ModelInfo> {
    vec![
        ModelInfo::new("m1", "Model One"),
        ModelInfo::new("m2", "Model Two"),
    ]
}

fn config(concurrency: usize, delay_ms: u64, timeout_ms: u64) -> RunConfig {
    RunConfig {
        scheduler: SchedulerConfig {
            concurrency,
            batch_delay: Duration::from_millis(delay_ms),
            item_timeout: Duration::from_millis(timeout_ms),
        },
        ..Default::default()
    }
}

fn request() -> RunRequest {
    RunRequest::new("Explain {{topic}} to a child")
        .with_variables(vec![VariableSpec::new("topic")])
        .with_models(models())
        .select(vec!["m1".to_string(), "m2".to_string()])
}

#[tokio::test(start_paused = true)]
async fn two_cases_two_models_in_two_batches() {
    let client = Arc::new(
        ScriptedClient::new()
            .respond_when("diverse test cases", SYNTHESIZED)
            .respond("m1", "The moon tugs on the sea, making tides.")
            .after(Duration::from_millis(50))
            .respond("m2", "ok")
            .after(Duration::from_millis(50)),
    );
    let runner = AutoTestRunner::new(client.clone()).with_config(config(2, 1000, 30_000));
    let start = tokio::time::Instant::now();

    let result = runner.run(request()).await.unwrap();

    let pairs: Vec<(&str, &str)> = result
        .results
        .iter()
        .map(|r| (r.test_case.id.as_str(), r.model_id.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![("tc_1", "m1"), ("tc_1", "m2"), ("tc_2", "m1"), ("tc_2", "m2")]
    );

    // two 50ms batches and one pause between them
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1100), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1200), "{elapsed:?}");

    let summary = &result.summary;
    assert_eq!(summary.total_tests, 4);
    assert_eq!(summary.passed_tests, 2);
    assert_eq!(summary.failed_tests, 2);
    assert!(!summary.overall_passed);
    assert_eq!(summary.average_score, 50.0);
    assert_eq!(summary.model_results["m1"].total, 2);
    assert_eq!(summary.model_results["m1"].passed, 2);
    assert_eq!(summary.model_results["m2"].failed, 2);

    let prompts: Vec<String> = client
        .calls()
        .into_iter()
        .map(|c| c.prompt)
        .filter(|p| !p.contains("diverse test cases"))
        .collect();
    assert!(prompts.contains(&"Explain tides to a child".to_string()));
    assert!(prompts.contains(&"Explain volcanoes to a child".to_string()));
    // both items of a batch overlap, never more than the batch size
    assert_eq!(client.max_in_flight(), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_model_times_out_without_blocking_others() {
    let client = Arc::new(
        ScriptedClient::new()
            .respond_when("diverse test cases", SYNTHESIZED)
            .respond("m1", "A perfectly reasonable explanation.")
            .after(Duration::from_secs(120))
            .respond("m2", "Another perfectly reasonable explanation."),
    );
    let runner = AutoTestRunner::new(client).with_config(config(2, 0, 30_000));

    let result = runner.run(request()).await.unwrap();

    assert_eq!(result.results.len(), 4);
    for r in &result.results {
        if r.model_id == "m1" {
            assert!(!r.passed);
            assert_eq!(r.evaluation.overall, 25);
            assert!(r.evaluation.critique.starts_with("Timeout"));
            assert_eq!(r.model_name, "Model One");
        } else {
            assert!(r.passed);
            assert_eq!(r.evaluation.overall, 75);
        }
    }
}

#[tokio::test]
async fn synthesis_failure_uses_samples() {
    let client = Arc::new(
        ScriptedClient::new()
            .fail_when("diverse test cases", ProviderError::status("fake", 429, "slow down")),
    );
    let samples = SampleTable::empty().with_values("topic", vec!["rainbows".to_string()]);
    let runner = AutoTestRunner::new(client)
        .with_config(config(2, 0, 5_000))
        .with_samples(samples);

    let result = runner.run(request()).await.unwrap();

    // min(3, 1 + 1) fallback cases, both using the only sample value
    assert_eq!(result.test_cases.len(), 2);
    assert!(result
        .test_cases
        .iter()
        .all(|c| c.input["topic"] == "rainbows"));
    assert_eq!(result.results.len(), 4);
    // echoed prompts are long enough to pass the heuristic
    assert!(result.summary.overall_passed);
}

#[tokio::test]
async fn accurate_mode_scores_with_scorer() {
    let client = Arc::new(ScriptedClient::new().respond_when("diverse test cases", SYNTHESIZED));
    let scorer = Arc::new(FixedScorer::new(EvaluationScore::weighted(
        90,
        80,
        70,
        "clear and on topic",
    )));
    let runner = AutoTestRunner::new(client)
        .with_scorer(scorer.clone())
        .with_config(config(2, 0, 5_000).accurate());

    let result = runner.run(request()).await.unwrap();

    assert_eq!(scorer.calls(), 4);
    assert!(result.results.iter().all(|r| r.evaluation.overall == 82));
    assert!(result.summary.overall_passed);
    assert_eq!(result.summary.average_score, 82.0);
}

#[tokio::test]
async fn accurate_mode_without_scorer_is_rejected() {
    let client = Arc::new(ScriptedClient::new());
    let runner = AutoTestRunner::new(client.clone()).with_config(config(2, 0, 5_000).accurate());

    let err = runner.run(request()).await.unwrap_err();

    assert!(matches!(err, EngineError::InvalidConfig(_)));
    assert!(client.calls().is_empty());
    assert_eq!(runner.progress().state, RunState::Failed);
}

#[tokio::test(start_paused = true)]
async fn progress_reports_batches_and_completion() {
    let client = Arc::new(ScriptedClient::new().respond_when("diverse test cases", SYNTHESIZED));
    let runner = AutoTestRunner::new(client).with_config(config(1, 10, 5_000));
    let mut progress = runner.subscribe();

    let (result, phases) = tokio::join!(runner.run(request()), async {
        let mut phases = Vec::new();
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            phases.push(snapshot.phase.clone());
            if snapshot.state.is_terminal() {
                break;
            }
        }
        phases
    });

    assert_eq!(result.unwrap().results.len(), 4);
    assert_eq!(phases.last().map(String::as_str), Some("Completed"));
    // the watcher catches up during each pause between batches
    for batch in 1..=3 {
        let phase = format!("Processing batch {batch}/4…");
        assert!(phases.contains(&phase), "missing {phase} in {phases:?}");
    }
}
