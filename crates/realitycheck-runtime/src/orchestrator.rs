//! Parallel fan-out of the risk agents.
//!
//! The orchestrator implements:
//! - Staggered fan-out: each dimension starts after its slot delay
//! - Wait-for-all fan-in: a slow agent delays the report, a failed one
//!   only leaves its dimension empty
//! - Deterministic aggregation in canonical dimension order

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use realitycheck_core::{AggregatedReport, Dimension, RiskReport, RiskReportSchema};

use crate::agents::{run_agent, AgentRegistry, AgentResult, AgentSettings};
use crate::providers::LlmProvider;
use crate::resilience::LlmUsage;

/// Start delay per dimension slot, in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaggerSchedule {
    #[serde(with = "crate::config::humantime_duration::list")]
    delays: Vec<Duration>,
}

impl Default for StaggerSchedule {
    fn default() -> Self {
        Self::from_secs([0, 2, 4, 6, 8])
    }
}

impl StaggerSchedule {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub fn from_secs(secs: [u64; 5]) -> Self {
        Self::new(secs.into_iter().map(Duration::from_secs).collect())
    }

    /// Delay for a dimension. Missing slots start immediately.
    pub fn delay_for(&self, dimension: Dimension) -> Duration {
        self.delays
            .get(dimension.index())
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}

/// Runs every registered risk agent against one idea.
pub struct RiskOrchestrator {
    provider: Arc<dyn LlmProvider>,
    registry: AgentRegistry,
    settings: AgentSettings,
    stagger: StaggerSchedule,
}

impl RiskOrchestrator {
    /// Orchestrator over the five built-in agents with default settings.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            registry: AgentRegistry::default_dimensions(),
            settings: AgentSettings::default(),
            stagger: StaggerSchedule::default(),
        }
    }

    pub fn with_registry(mut self, registry: AgentRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_stagger(mut self, stagger: StaggerSchedule) -> Self {
        self.stagger = stagger;
        self
    }

    /// Run all agents and aggregate their reports.
    ///
    /// Never fails: a failed agent leaves its dimension absent and adds one
    /// message to `errors`.
    pub async fn run_all(&self, idea: &str) -> AggregatedReport {
        let (report, _usage) = aggregate(self.fan_out(idea).await);
        report
    }

    /// Run all registered agents concurrently, staggered by slot.
    ///
    /// Results come back in canonical dimension order.
    pub async fn fan_out(&self, idea: &str) -> Vec<(Dimension, AgentResult<RiskReport>)> {
        tracing::info!(
            provider = self.provider.name(),
            agents = self.registry.len(),
            "Starting risk analysis"
        );

        let runs = self.registry.iter().map(|(dimension, spec)| {
            let delay = self.stagger.delay_for(dimension);
            let span = tracing::info_span!("risk_agent", dimension = %dimension);
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let result = run_agent(
                    self.provider.as_ref(),
                    spec,
                    &RiskReportSchema,
                    idea,
                    &self.settings,
                )
                .await;
                (dimension, result)
            }
            .instrument(span)
        });

        join_all(runs).await
    }
}

/// Fold agent results into a report and summed usage.
///
/// Dimensions without a result are recorded as failures.
pub fn aggregate(
    results: Vec<(Dimension, AgentResult<RiskReport>)>,
) -> (AggregatedReport, LlmUsage) {
    let mut report = AggregatedReport::new();
    let mut usage = LlmUsage::default();
    let mut results: Vec<_> = results.into_iter().map(Some).collect();

    for dimension in Dimension::ALL {
        let found = results
            .iter_mut()
            .find(|r| matches!(r, Some((d, _)) if *d == dimension))
            .and_then(Option::take);

        let Some((_, result)) = found else {
            report.record_failure(dimension, "no agent registered for this dimension");
            continue;
        };

        usage.merge(result.usage());
        if let Some(raw) = result.raw_output() {
            report.raw_outputs.insert(dimension, raw.to_string());
        }

        match result {
            AgentResult::Success { data, .. } => report.set(dimension, data),
            AgentResult::Failure { error, .. } => {
                tracing::warn!(dimension = %dimension, error = %error, "Risk agent failed");
                report.record_failure(dimension, error);
            }
        }
    }

    (report, usage)
}
