//! Output formatters for run results
//!
//! Provides table, JSON, CSV and summary output formats.

use crate::executor::test_case_number;
use crate::models::{AutoTestResult, ModelStats, RunSummary, TestResult};

const PROMPT_PREVIEW_CHARS: usize = 48;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a complete run
    pub fn format_run(&self, run: &AutoTestResult) -> String {
        match self.format {
            OutputFormat::Table => self.format_run_table(run),
            OutputFormat::Json => serde_json::to_string(run).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(run).unwrap_or_default(),
            OutputFormat::Csv => format_run_csv(run),
            OutputFormat::Summary => self.format_summary_brief(&run.summary),
        }
    }

    /// One table row; `index` is the result's position in the run
    pub fn format_result(&self, index: usize, model_count: usize, result: &TestResult) -> String {
        format!(
            "{:2}. {:22} {} {:>3}/100 [{:>6}ms]",
            test_case_number(index, model_count),
            truncate(&result.model_name, 22),
            self.status(result.passed),
            result.evaluation.overall,
            result.execution_time_ms
        )
    }

    fn status(&self, passed: bool) -> &'static str {
        match (passed, self.colorize) {
            (true, true) => "\x1b[32m✓ PASS\x1b[0m",
            (false, true) => "\x1b[31m✗ FAIL\x1b[0m",
            (true, false) => "✓ PASS",
            (false, false) => "✗ FAIL",
        }
    }

    fn rate(&self, rate: f64) -> String {
        let text = format!("{rate:5.1}%");
        if !self.colorize {
            return text;
        }
        if rate >= 90.0 {
            format!("\x1b[32m{text}\x1b[0m")
        } else if rate >= 50.0 {
            format!("\x1b[33m{text}\x1b[0m")
        } else {
            format!("\x1b[31m{text}\x1b[0m")
        }
    }

    fn format_run_table(&self, run: &AutoTestResult) -> String {
        let summary = &run.summary;
        let model_count = summary.model_results.len();
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!(
            "║  Prompt: {:52}║\n",
            truncate(&first_line(&run.prompt), PROMPT_PREVIEW_CHARS)
        ));
        output.push_str(&format!(
            "║  {} test cases x {} models = {} results{:width$}║\n",
            run.test_cases.len(),
            model_count,
            run.results.len(),
            "",
            width = 26usize.saturating_sub(
                digits(run.test_cases.len()) + digits(model_count) + digits(run.results.len())
            )
        ));
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        for (index, result) in run.results.iter().enumerate() {
            output.push_str(&format!(
                "  {}\n",
                self.format_result(index, model_count, result)
            ));
            if !result.passed && !result.evaluation.critique.is_empty() {
                output.push_str(&format!(
                    "      {}\n",
                    truncate(&result.evaluation.critique, 70)
                ));
            }
        }

        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        output.push_str("  Per model:\n");
        for (model_id, stats) in &summary.model_results {
            output.push_str(&self.format_model_line(model_id, stats));
        }

        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        output.push_str(&format!(
            "  Total: {:3} | Pass: {:3} | Fail: {:3} | Rate: {} | Avg: {:6.2}\n",
            summary.total_tests,
            summary.passed_tests,
            summary.failed_tests,
            self.rate(summary.pass_rate()),
            summary.average_score
        ));
        output.push_str(&format!(
            "  Overall: {}\n",
            self.status(summary.overall_passed)
        ));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }

    fn format_model_line(&self, model_id: &str, stats: &ModelStats) -> String {
        format!(
            "    {:24} {:3}/{:<3} passed {}\n",
            truncate(model_id, 24),
            stats.passed,
            stats.total,
            self.rate(stats.pass_rate())
        )
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        format!(
            "{}/{} passed ({:.1}%), average score {:.2}: {}",
            summary.passed_tests,
            summary.total_tests,
            summary.pass_rate(),
            summary.average_score,
            if summary.overall_passed { "PASS" } else { "FAIL" }
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// CSV header shared with the file export
pub const CSV_HEADER: &[&str] = &[
    "test_case",
    "test_case_id",
    "model_id",
    "model_name",
    "passed",
    "relevance",
    "clarity",
    "creativity",
    "overall",
    "execution_time_ms",
    "total_tokens",
    "critique",
];

/// CSV fields for one result
pub fn csv_record(index: usize, model_count: usize, result: &TestResult) -> Vec<String> {
    let score = &result.evaluation;
    vec![
        test_case_number(index, model_count).to_string(),
        result.test_case.id.clone(),
        result.model_id.clone(),
        result.model_name.clone(),
        result.passed.to_string(),
        score.relevance.to_string(),
        score.clarity.to_string(),
        score.creativity.to_string(),
        score.overall.to_string(),
        result.execution_time_ms.to_string(),
        result.token_usage.total.to_string(),
        score.critique.clone(),
    ]
}

fn format_run_csv(run: &AutoTestResult) -> String {
    let model_count = run.summary.model_results.len();
    let mut writer = csv::Writer::from_writer(Vec::new());
    let written = writer.write_record(CSV_HEADER).and_then(|_| {
        run.results
            .iter()
            .enumerate()
            .try_for_each(|(i, r)| writer.write_record(csv_record(i, model_count, r)))
    });
    if written.is_err() {
        return String::new();
    }
    writer
        .into_inner()
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

fn digits(n: usize) -> usize {
    n.to_string().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::aggregate;
    use crate::models::{EvaluationScore, TestCase, TokenUsage, WorkItem};

    fn run() -> AutoTestResult {
        let cases = vec![TestCase::new("tc_1"), TestCase::new("tc_2")];
        let mut results = Vec::new();
        for case in &cases {
            for (model, overall) in [("m1", 80), ("m2", 30)] {
                let item = WorkItem::new(case.clone(), model);
                results.push(TestResult::new(
                    &item,
                    format!("Model {model}"),
                    "output",
                    EvaluationScore::uniform(overall, "needs work, \"really\""),
                    12,
                    TokenUsage::new(3, 4),
                ));
            }
        }
        let summary = aggregate(&results, &["m1".to_string(), "m2".to_string()]);
        AutoTestResult {
            prompt: "Summarize {{topic}}\nin one line".to_string(),
            test_cases: cases,
            results,
            summary,
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TABLE"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("json-pretty"), Some(OutputFormat::JsonPretty));
        assert_eq!(OutputFormat::from_str("unknown"), None);
    }

    #[test]
    fn test_table_labels_test_cases() {
        let output = ResultFormatter::new(OutputFormat::Table)
            .no_color()
            .format_run(&run());

        let rows: Vec<&str> = output.lines().filter(|l| l.contains("/100")).collect();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].trim_start().starts_with("1."));
        assert!(rows[1].trim_start().starts_with("1."));
        assert!(rows[2].trim_start().starts_with("2."));
        assert!(output.contains("Summarize {{topic}}"));
        assert!(!output.contains("in one line"));
        assert!(output.contains("✗ FAIL"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_csv_escapes_and_labels() {
        let output = ResultFormatter::new(OutputFormat::Csv).format_run(&run());
        let mut reader = csv::Reader::from_reader(output.as_bytes());

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 4);
        assert_eq!(&records[3][0], "2");
        assert_eq!(&records[3][2], "m2");
        assert_eq!(&records[0][11], "needs work, \"really\"");
    }

    #[test]
    fn test_summary_and_json() {
        let run = run();
        let brief = ResultFormatter::new(OutputFormat::Summary).format_run(&run);
        assert_eq!(brief, "2/4 passed (50.0%), average score 55.00: FAIL");

        let json = ResultFormatter::new(OutputFormat::Json).format_run(&run);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["total_tests"], 4);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
