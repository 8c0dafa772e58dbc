//! Schema-validated agent execution.
//!
//! One call of [`run_agent`] sends the rendered prompts to the backend,
//! strips code fences, parses JSON and validates it against the output
//! schema. Failures are retried under the [`RetryPolicy`]:
//! - rate limits wait a fixed delay and do not consume the retry budget
//! - everything else consumes one unit of the budget and retries at once

use serde::{Deserialize, Serialize};

use realitycheck_core::{parse_json_output, OutputSchema};

use super::{AgentError, AgentResult, AgentSpec};
use crate::prompts;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider};
use crate::resilience::{LlmUsage, RetryPolicy};

/// Backend parameters and retry policy used for every agent call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    pub completion: CompletionConfig,
    pub retry: RetryPolicy,
}

/// Failure of a single attempt, with the raw text if the backend answered.
struct AttemptFailure {
    error: AgentError,
    raw_output: Option<String>,
}

impl AttemptFailure {
    fn without_output(error: AgentError) -> Self {
        Self {
            error,
            raw_output: None,
        }
    }
}

/// Run an agent until it yields schema-valid output or the policy gives up.
///
/// Never panics and never returns `Err`: every failure is folded into
/// [`AgentResult::Failure`] together with the last raw text observed.
pub async fn run_agent<S: OutputSchema>(
    provider: &dyn LlmProvider,
    spec: &AgentSpec,
    schema: &S,
    input: &str,
    settings: &AgentSettings,
) -> AgentResult<S::Output> {
    let messages = vec![
        ChatMessage::system(prompts::system_prompt(spec)),
        ChatMessage::user(prompts::user_prompt(input)),
    ];
    let policy = &settings.retry;

    let mut retries_left = policy.retry_budget;
    let mut rate_limit_waits = 0u32;
    let mut attempts = 0u32;
    let mut usage = LlmUsage::default();
    let mut last_raw: Option<String> = None;

    loop {
        attempts = attempts.saturating_add(1);

        let failure = match attempt(provider, &messages, schema, settings, &mut usage).await {
            Ok((data, raw_output)) => {
                tracing::debug!(agent = %spec.name, attempts, "Agent output accepted");
                return AgentResult::Success {
                    data,
                    raw_output,
                    attempts,
                    usage,
                };
            }
            Err(failure) => failure,
        };

        if failure.raw_output.is_some() {
            last_raw = failure.raw_output;
        }
        let error = failure.error;

        if error.is_rate_limited() {
            if policy.allows_rate_limit_wait(rate_limit_waits) {
                rate_limit_waits += 1;
                tracing::warn!(
                    agent = %spec.name,
                    waits = rate_limit_waits,
                    delay = ?policy.rate_limit_delay,
                    "Hit rate limit, waiting before retry"
                );
                tokio::time::sleep(policy.rate_limit_delay).await;
                continue;
            }

            tracing::warn!(
                agent = %spec.name,
                waits = rate_limit_waits,
                "Rate-limit wait ceiling reached"
            );
            return AgentResult::Failure {
                error: AgentError::RateLimited {
                    waits: rate_limit_waits,
                    message: error.to_string(),
                },
                raw_output: last_raw,
                attempts,
                usage,
            };
        }

        if retries_left > 0 {
            retries_left -= 1;
            tracing::warn!(agent = %spec.name, error = %error, "Agent attempt failed, retrying");
            if let Some(raw) = &last_raw {
                tracing::debug!(agent = %spec.name, raw_output = %raw, "Rejected output");
            }
            continue;
        }

        tracing::warn!(agent = %spec.name, attempts, error = %error, "Agent failed");
        return AgentResult::Failure {
            error,
            raw_output: last_raw,
            attempts,
            usage,
        };
    }
}

async fn attempt<S: OutputSchema>(
    provider: &dyn LlmProvider,
    messages: &[ChatMessage],
    schema: &S,
    settings: &AgentSettings,
    usage: &mut LlmUsage,
) -> Result<(S::Output, String), AttemptFailure> {
    let call = provider.complete(messages.to_vec(), &settings.completion);

    let response = match settings.retry.call_timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| AttemptFailure::without_output(AgentError::Timeout(limit)))?,
        None => call.await,
    }
    .map_err(|e| AttemptFailure::without_output(e.into()))?;

    usage.add(&response.usage, &response.model);
    let raw_output = response.content;

    let value = match parse_json_output(&raw_output) {
        Ok(value) => value,
        Err(e) => {
            return Err(AttemptFailure {
                error: AgentError::InvalidJson(e.to_string()),
                raw_output: Some(raw_output),
            })
        }
    };

    match schema.validate(&value) {
        Ok(data) => Ok((data, raw_output)),
        Err(violation) => Err(AttemptFailure {
            error: violation.into(),
            raw_output: Some(raw_output),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedProvider;
    use crate::providers::ProviderError;
    use realitycheck_core::{RiskReport, RiskReportSchema, VerdictReportSchema};
    use std::time::Duration;

    const VALID: &str =
        r#"{"risk_score": 72, "key_findings": ["crowded"], "hidden_risks": [], "confidence": 80}"#;

    fn spec() -> AgentSpec {
        AgentSpec::new("Test Agent", "Tester", "Runs tests").instruction("Be strict.")
    }

    async fn run_risk(
        provider: &ScriptedProvider,
        settings: &AgentSettings,
    ) -> AgentResult<RiskReport> {
        run_agent(provider, &spec(), &RiskReportSchema, "idea", settings).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_output_first_try() {
        let provider = ScriptedProvider::new().then_reply(VALID);
        let result = run_risk(&provider, &AgentSettings::default()).await;

        let report = result.data().unwrap();
        assert_eq!(report.risk_score, 72);
        assert_eq!(result.attempts(), 1);
        assert_eq!(result.usage().llm_calls, 1);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompts_sent_to_backend() {
        let provider = ScriptedProvider::new().then_reply(VALID);
        let settings = AgentSettings::default();
        run_agent(&provider, &spec(), &RiskReportSchema, "Uber for dogs", &settings).await;

        let calls = provider.calls();
        assert_eq!(calls[0][0].role, "system");
        assert!(calls[0][0].content.starts_with("You are the Test Agent."));
        assert_eq!(calls[0][1].content, "Analyze this idea: \"Uber for dogs\"");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fenced_output_accepted() {
        let fenced = format!("```json\n{}\n```", VALID);
        let provider = ScriptedProvider::new().then_reply(fenced.clone());
        let result = run_risk(&provider, &AgentSettings::default()).await;

        assert!(result.is_success());
        assert_eq!(result.raw_output(), Some(fenced.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_json_then_valid_uses_one_retry() {
        let provider = ScriptedProvider::new()
            .then_reply("not json at all")
            .then_reply(VALID);
        let result = run_risk(&provider, &AgentSettings::default()).await;

        assert!(result.is_success());
        assert_eq!(provider.call_count(), 2);
        assert_eq!(result.usage().llm_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhausted_returns_last_raw_output() {
        let provider = ScriptedProvider::new()
            .then_reply("{\"risk_score\": 500}")
            .then_reply("{\"risk_score\": 150}");
        let result = run_risk(&provider, &AgentSettings::default()).await;

        match &result {
            AgentResult::Failure { error, raw_output, attempts, .. } => {
                assert!(matches!(error, AgentError::SchemaViolation(_)));
                assert!(error.to_string().starts_with("Validation failed"));
                assert_eq!(raw_output.as_deref(), Some("{\"risk_score\": 150}"));
                assert_eq!(*attempts, 2);
            }
            _ => panic!("Expected failure"),
        }
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_fails_immediately() {
        let provider = ScriptedProvider::new().then_reply("nope").then_reply(VALID);
        let settings = AgentSettings {
            retry: RetryPolicy {
                retry_budget: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = run_risk(&provider, &settings).await;

        assert!(matches!(result.error(), Some(AgentError::InvalidJson(_))));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_without_consuming_budget() {
        let provider = ScriptedProvider::new()
            .then_error(ProviderError::RateLimited { retry_after: None })
            .then_error(ProviderError::RateLimited { retry_after: None })
            .then_error(ProviderError::RateLimited { retry_after: None })
            .then_reply("garbage")
            .then_reply(VALID);

        let start = tokio::time::Instant::now();
        let result = run_risk(&provider, &AgentSettings::default()).await;

        assert!(result.is_success());
        assert_eq!(result.attempts(), 5);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_detected_in_message() {
        let provider = ScriptedProvider::new()
            .then_error(ProviderError::HttpError("status 429 from upstream".to_string()))
            .then_reply(VALID);
        let settings = AgentSettings {
            retry: RetryPolicy {
                retry_budget: 0,
                ..Default::default()
            },
            ..Default::default()
        };

        let start = tokio::time::Instant::now();
        let result = run_risk(&provider, &settings).await;

        assert!(result.is_success());
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_ceiling() {
        let provider =
            ScriptedProvider::repeating_error(ProviderError::RateLimited { retry_after: None });
        let settings = AgentSettings {
            retry: RetryPolicy {
                max_rate_limit_waits: Some(2),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = run_risk(&provider, &settings).await;

        match result.error() {
            Some(AgentError::RateLimited { waits, .. }) => assert_eq!(*waits, 2),
            other => panic!("Expected rate-limit failure, got {:?}", other),
        }
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_consumes_budget() {
        let provider = ScriptedProvider::new()
            .then_error(ProviderError::HttpError("connection reset".to_string()))
            .then_error(ProviderError::HttpError("connection reset".to_string()))
            .then_reply(VALID);
        let result = run_risk(&provider, &AgentSettings::default()).await;

        assert!(matches!(result.error(), Some(AgentError::Transport(_))));
        assert_eq!(result.raw_output(), None);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out() {
        let provider = ScriptedProvider::repeating(VALID).with_latency(Duration::from_secs(120));
        let settings = AgentSettings {
            retry: RetryPolicy {
                retry_budget: 0,
                call_timeout: Some(Duration::from_secs(90)),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = run_risk(&provider, &settings).await;

        assert!(matches!(result.error(), Some(AgentError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_verdict_schema() {
        let provider = ScriptedProvider::new().then_reply(concat!(
            r#"{"success_probability": 12, "verdict": "KILL", "#,
            r#""top_failure_modes": ["a"], "improvement_actions": ["b"]}"#
        ));
        let settings = AgentSettings::default();
        let result = run_agent(&provider, &spec(), &VerdictReportSchema, "brief", &settings).await;

        assert_eq!(result.data().map(|v| v.success_probability), Some(12));
    }
}
