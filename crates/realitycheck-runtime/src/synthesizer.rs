//! Synthesis agent: turns the aggregated report into a verdict.
//!
//! # Policy
//! The decision stance lives in configuration, not in code. The default
//! stance is conservative ("Start from NO"). A balanced stance and fully
//! custom instructions are available for callers who calibrate differently.
//!
//! The verdict's `success_probability` is the agent's own estimate. It is
//! reported next to the scoring engine's number and never reconciled with it.

use serde::{Deserialize, Serialize};

use realitycheck_core::{synthesis_brief, AggregatedReport, VerdictReport, VerdictReportSchema};

use crate::agents::{run_agent, AgentResult, AgentSettings, AgentSpec};
use crate::prompts;
use crate::providers::LlmProvider;

/// Built-in decision stances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Start from NO; PROCEED only on overwhelming evidence
    #[default]
    Conservative,

    /// Weigh evidence without a built-in bias toward KILL
    Balanced,
}

/// Decision instructions handed to the synthesis agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPolicy {
    /// Built-in stance
    pub stance: Stance,

    /// Replaces the stance text entirely when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<String>>,

    /// Appended after the stance (or replacement) text
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_instructions: Vec<String>,
}

impl DecisionPolicy {
    pub fn conservative() -> Self {
        Self::default()
    }

    pub fn balanced() -> Self {
        Self {
            stance: Stance::Balanced,
            ..Default::default()
        }
    }

    /// Policy made only of the given instructions.
    pub fn custom<I, S>(instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instructions: Some(instructions.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    /// Effective decision instructions, in order.
    pub fn instructions(&self) -> Vec<String> {
        let base: Vec<String> = match (&self.instructions, self.stance) {
            (Some(custom), _) => custom.clone(),
            (None, Stance::Conservative) => {
                prompts::CONSERVATIVE_POLICY.iter().map(|s| s.to_string()).collect()
            }
            (None, Stance::Balanced) => {
                prompts::BALANCED_POLICY.iter().map(|s| s.to_string()).collect()
            }
        };

        base.into_iter()
            .chain(self.extra_instructions.iter().cloned())
            .collect()
    }
}

/// Runs the synthesis agent over an aggregated report.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    spec: AgentSpec,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(&DecisionPolicy::default())
    }
}

impl Synthesizer {
    pub fn new(policy: &DecisionPolicy) -> Self {
        Self {
            spec: prompts::synthesis_spec(policy.instructions()),
        }
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    /// Produce a verdict for the idea.
    ///
    /// Partial reports are passed through as they are; absent dimensions are
    /// marked in the brief and nothing is inferred for them.
    pub async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        idea: &str,
        report: &AggregatedReport,
        settings: &AgentSettings,
    ) -> AgentResult<VerdictReport> {
        let brief = synthesis_brief(idea, report);
        tracing::debug!(
            present = report.present_dimensions().len(),
            brief_len = brief.len(),
            "Running synthesis"
        );

        let result = run_agent(provider, &self.spec, &VerdictReportSchema, &brief, settings).await;

        match &result {
            AgentResult::Success { data, .. } => tracing::info!(
                verdict = %data.verdict,
                success_probability = data.success_probability,
                "Synthesis complete"
            ),
            AgentResult::Failure { error, .. } => {
                tracing::error!(error = %error, "Synthesis failed")
            }
        }

        result
    }
}
