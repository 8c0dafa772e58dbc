//! End-to-end analysis of one idea.
//!
//! # Execution Flow
//! 1. Fan-out: all risk agents run concurrently, staggered by slot
//! 2. Fan-in: wait for every agent, failures leave their dimension absent
//! 3. Score: deterministic weighted score from the aggregated report
//! 4. Synthesize: one more agent turns the report into a verdict

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use realitycheck_core::{inputs_from_report, score, AggregatedReport, ScoreOutcome, VerdictReport};

use crate::agents::{AgentRegistry, AgentResult, AgentSettings};
use crate::config::{RuntimeConfig, ScoringConfig};
use crate::orchestrator::{aggregate, RiskOrchestrator};
use crate::providers::{LlmProvider, ProviderRegistry};
use crate::resilience::LlmUsage;
use crate::synthesizer::Synthesizer;
use crate::RuntimeError;

/// Everything one analysis produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    /// The idea as submitted
    pub idea: String,

    /// Per-dimension reports and failures
    pub analysis: AggregatedReport,

    /// Deterministic score from the risk reports
    pub score: ScoreOutcome,

    /// Verdict of the synthesis agent, absent if it failed
    pub verdict: Option<VerdictReport>,

    /// Why synthesis failed, when it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis_error: Option<String>,

    /// Usage summed over every agent run
    pub usage: LlmUsage,

    pub analyzed_at: DateTime<Utc>,
}

/// Runs the full pipeline against a provider.
pub struct Analyzer {
    provider: Arc<dyn LlmProvider>,
    orchestrator: RiskOrchestrator,
    synthesizer: Synthesizer,
    settings: AgentSettings,
    scoring: ScoringConfig,
}

impl Analyzer {
    /// Analyzer over the built-in agents.
    pub fn new(provider: Arc<dyn LlmProvider>, config: &RuntimeConfig) -> Self {
        let settings = AgentSettings {
            completion: config.completion.clone(),
            retry: config.retry.clone(),
        };

        let orchestrator = RiskOrchestrator::new(provider.clone())
            .with_settings(settings.clone())
            .with_stagger(config.stagger.clone());

        Self {
            provider,
            orchestrator,
            synthesizer: Synthesizer::new(&config.decision_policy),
            settings,
            scoring: config.scoring.clone(),
        }
    }

    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Build the provider named in the configuration and wrap it.
    pub fn from_config(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let provider = ProviderRegistry::with_defaults()
            .create(&config.provider.kind, &config.provider.options)
            .map_err(|e| RuntimeError::ProviderNotConfigured(e.to_string()))?;

        Self::builder().provider(provider).config(config).build()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Analyze an idea.
    ///
    /// Never fails: agent failures show up in `analysis.errors`, a failed
    /// synthesis as `verdict: None`.
    pub async fn analyze(&self, idea: &str) -> AnalysisOutcome {
        let (analysis, mut usage) = aggregate(self.orchestrator.fan_out(idea).await);
        if analysis.is_partial() {
            tracing::warn!(
                failed = analysis.failed_dimensions().len(),
                "Continuing with partial analysis"
            );
        }

        let inputs = inputs_from_report(
            &analysis,
            &self.scoring.weights,
            self.scoring.absent_dimension,
        );
        let score = score(&inputs);
        tracing::info!(
            probability = score.probability,
            penalty = score.penalty,
            "Scored analysis"
        );

        let result = self
            .synthesizer
            .synthesize(self.provider.as_ref(), idea, &analysis, &self.settings)
            .await;
        usage.merge(result.usage());

        let (verdict, synthesis_error) = match result {
            AgentResult::Success { data, .. } => (Some(data), None),
            AgentResult::Failure { error, .. } => (None, Some(error.to_string())),
        };

        AnalysisOutcome {
            idea: idea.to_string(),
            analysis,
            score,
            verdict,
            synthesis_error,
            usage,
            analyzed_at: Utc::now(),
        }
    }

    /// Analyze an idea unless the token is cancelled first.
    ///
    /// Cancellation drops every in-flight backend call.
    pub async fn analyze_with_cancellation(
        &self,
        idea: &str,
        token: &CancellationToken,
    ) -> Result<AnalysisOutcome, RuntimeError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::warn!("Analysis cancelled");
                Err(RuntimeError::Cancelled)
            }
            outcome = self.analyze(idea) => Ok(outcome),
        }
    }
}

/// Builder for [`Analyzer`].
#[derive(Default)]
pub struct AnalyzerBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    config: RuntimeConfig,
    registry: Option<AgentRegistry>,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the built-in risk agents.
    pub fn registry(mut self, registry: AgentRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<Analyzer, RuntimeError> {
        let provider = self
            .provider
            .ok_or_else(|| RuntimeError::ProviderNotConfigured("No provider set".to_string()))?;
        self.config.validate()?;

        let mut analyzer = Analyzer::new(provider, &self.config);
        if let Some(registry) = self.registry {
            analyzer.orchestrator = analyzer.orchestrator.with_registry(registry);
        }
        Ok(analyzer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedProvider;
    use realitycheck_core::Verdict;
    use std::time::Duration;

    const RISK: &str =
        r#"{"risk_score": 50, "key_findings": ["f"], "hidden_risks": [], "confidence": 60}"#;
    const VERDICT: &str = concat!(
        r#"{"success_probability": 30, "verdict": "PIVOT", "#,
        r#""top_failure_modes": ["a"], "improvement_actions": ["b"]}"#
    );

    fn provider() -> ScriptedProvider {
        ScriptedProvider::repeating(RISK).route("Synthesis Agent", VERDICT)
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(
            Analyzer::builder().build(),
            Err(RuntimeError::ProviderNotConfigured(_))
        ));
    }

    #[test]
    fn test_builder_validates_config() {
        let mut config = RuntimeConfig::default();
        config.scoring.weights.market = -1.0;

        let result = Analyzer::builder()
            .provider(Arc::new(provider()))
            .config(config)
            .build();
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }

    #[test]
    fn test_from_config_unknown_provider() {
        let mut config = RuntimeConfig::default();
        config.provider.kind = "carrier-pigeon".to_string();

        assert!(matches!(
            Analyzer::from_config(config),
            Err(RuntimeError::ProviderNotConfigured(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_happy_path() {
        let provider = Arc::new(provider());
        let analyzer = Analyzer::new(provider.clone(), &RuntimeConfig::default());

        let outcome = analyzer.analyze("Subscription socks for cats").await;

        assert!(outcome.analysis.errors.is_empty());
        assert_eq!(outcome.score.probability, 50);
        assert_eq!(outcome.verdict.map(|v| v.verdict), Some(Verdict::Pivot));
        assert_eq!(outcome.usage.llm_calls, 6);
        assert_eq!(provider.call_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthesis_failure_yields_no_verdict() {
        let provider = Arc::new(ScriptedProvider::repeating(RISK).route("Synthesis Agent", "{}"));
        let analyzer = Analyzer::new(provider, &RuntimeConfig::default());

        let outcome = analyzer.analyze("Subscription socks for cats").await;

        assert!(outcome.verdict.is_none());
        assert!(outcome.synthesis_error.is_some());
        assert_eq!(outcome.score.probability, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation() {
        let provider = Arc::new(provider().with_latency(Duration::from_secs(30)));
        let analyzer = Analyzer::new(provider, &RuntimeConfig::default());
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let result = analyzer.analyze_with_cancellation("idea", &token).await;
        assert!(matches!(result, Err(RuntimeError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_cancelled_completes() {
        let analyzer = Analyzer::new(Arc::new(provider()), &RuntimeConfig::default());
        let token = CancellationToken::new();

        let outcome = analyzer.analyze_with_cancellation("idea", &token).await.unwrap();
        assert!(outcome.verdict.is_some());
    }
}
