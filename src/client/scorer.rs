//! LLM-backed output scorer.
//!
//! Asks a judge model for relevance, clarity and creativity scores and
//! derives the overall score locally with the 0.40/0.35/0.25 weights.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::error::EvaluationError;
use super::json::{extract_object, score_field, value_to_string};
use super::{CompletionClient, CompletionRequest, Scorer};
use crate::models::EvaluationScore;

/// Score used for each dimension when the judge's reply cannot be parsed
const UNPARSEABLE_SCORE: u8 = 50;

const JUDGE_MAX_TOKENS: u32 = 500;

const JUDGE_SYSTEM: &str = "You are a strict evaluator of language model outputs. \
Rate the response to the given prompt on three criteria, each an integer from 0 to 100: \
relevance (does it address the prompt), clarity (is it well organised and easy to follow) \
and creativity (is it original and engaging). Reply with a single JSON object of the form \
{\"relevance\": <int>, \"clarity\": <int>, \"creativity\": <int>, \"critique\": \"<one or two sentences>\"} \
and nothing else.";

/// Scorer that delegates critique to a judge model
pub struct LlmScorer {
    client: Arc<dyn CompletionClient>,
    judge_model: String,
}

impl LlmScorer {
    pub fn new(client: Arc<dyn CompletionClient>, judge_model: impl Into<String>) -> Self {
        Self {
            client,
            judge_model: judge_model.into(),
        }
    }

    pub fn judge_model(&self) -> &str {
        &self.judge_model
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn evaluate(
        &self,
        prompt: &str,
        output: &str,
        temperature: f32,
    ) -> Result<EvaluationScore, EvaluationError> {
        let request = CompletionRequest::new(
            &self.judge_model,
            format!("PROMPT:\n{prompt}\n\nRESPONSE:\n{output}"),
        )
        .system(JUDGE_SYSTEM)
        .temperature(temperature)
        .max_tokens(JUDGE_MAX_TOKENS);

        let completion = self.client.generate(&request).await?;
        Ok(parse_score(&completion.content))
    }
}

/// Parse a judge reply; malformed replies yield a neutral score
pub fn parse_score(response: &str) -> EvaluationScore {
    let Some(object) = extract_object(response) else {
        warn!("Judge reply was not JSON; using neutral score");
        return EvaluationScore::uniform(
            UNPARSEABLE_SCORE,
            "Evaluation unavailable: the judge reply could not be parsed",
        );
    };

    let relevance = score_field(&object, "relevance");
    let clarity = score_field(&object, "clarity");
    let creativity = score_field(&object, "creativity");

    let (Some(relevance), Some(clarity), Some(creativity)) = (relevance, clarity, creativity) else {
        warn!("Judge reply missing score fields; using neutral score");
        return EvaluationScore::uniform(
            UNPARSEABLE_SCORE,
            "Evaluation unavailable: the judge reply was missing scores",
        );
    };

    let critique = object
        .get("critique")
        .map(value_to_string)
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| "No critique provided".to_string());

    EvaluationScore::weighted(relevance, clarity, creativity, critique)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fakes::ScriptedClient;
    use crate::client::ProviderError;

    #[test]
    fn test_parse_weighted_overall() {
        let score = parse_score(
            r#"{"relevance": 80, "clarity": 60, "creativity": 40, "critique": "Decent"}"#,
        );
        assert_eq!(score.overall, 63);
        assert_eq!(score.critique, "Decent");
        assert!(!score.passes());
    }

    #[test]
    fn test_parse_ignores_reported_overall() {
        let score = parse_score(
            r#"{"relevance": 90, "clarity": 90, "creativity": 90, "overall": 10, "critique": "x"}"#,
        );
        assert_eq!(score.overall, 90);
    }

    #[test]
    fn test_parse_fenced_reply() {
        let score = parse_score(
            "```json\n{\"relevance\": \"95\", \"clarity\": 85, \"creativity\": 70}\n```",
        );
        assert_eq!(score.relevance, 95);
        assert_eq!(score.critique, "No critique provided");
        assert!(score.passes());
    }

    #[test]
    fn test_parse_garbage_is_neutral() {
        let score = parse_score("I think it was pretty good!");
        assert_eq!(score.overall, 50);
        assert!(score.critique.contains("could not be parsed"));

        let partial = parse_score(r#"{"relevance": 90}"#);
        assert_eq!(partial.overall, 50);
    }

    #[tokio::test]
    async fn test_evaluate_uses_judge_model() {
        let client = Arc::new(ScriptedClient::new().respond(
            "judge",
            r#"{"relevance": 100, "clarity": 100, "creativity": 100, "critique": "Great"}"#,
        ));
        let scorer = LlmScorer::new(client.clone(), "judge");

        let score = scorer.evaluate("prompt", "output", 0.2).await.unwrap();
        assert_eq!(score.overall, 100);

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model_id, "judge");
        assert!(calls[0].prompt.contains("RESPONSE:\noutput"));
        assert!(calls[0].system.is_some());
    }

    #[tokio::test]
    async fn test_evaluate_propagates_transport_error() {
        let client = Arc::new(
            ScriptedClient::new().fail("judge", ProviderError::status("fake", 500, "down")),
        );
        let scorer = LlmScorer::new(client, "judge");

        let err = scorer.evaluate("p", "o", 0.3).await.unwrap_err();
        assert!(matches!(err, EvaluationError::Provider(_)));
    }
}
