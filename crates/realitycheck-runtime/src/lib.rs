//! # realitycheck-runtime
//!
//! LLM-backed analysis for Reality Check.
//!
//! This crate runs the five risk agents against an idea, scores the
//! aggregated report with `realitycheck-core`, and asks a synthesis agent for
//! a KILL / PIVOT / PROCEED verdict.
//!
//! ## Important
//!
//! Agent failures are values, not errors. [`Analyzer::analyze`] always
//! returns an [`AnalysisOutcome`]; missing dimensions are listed in
//! `analysis.errors` and a failed synthesis leaves `verdict` empty.
//!
//! ## Example
//!
//! ```rust,ignore
//! use realitycheck_runtime::{Analyzer, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_yaml_file("realitycheck.yaml")?;
//! let analyzer = Analyzer::from_config(config)?;
//!
//! let outcome = analyzer.analyze("A marketplace for used lab equipment").await;
//! println!("{:?} at {}%", outcome.verdict, outcome.score.probability);
//! ```

use thiserror::Error;

pub mod agents;
pub mod analysis;
pub mod config;
#[cfg(any(test, feature = "test-util"))]
pub mod fakes;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod synthesizer;

pub use agents::{
    run_agent, AgentError, AgentErrorKind, AgentRegistry, AgentResult, AgentSettings, AgentSpec,
};
pub use analysis::{AnalysisOutcome, Analyzer, AnalyzerBuilder};
pub use config::{ConfigError, ProviderSettings, RuntimeConfig, ScoringConfig};
pub use orchestrator::{RiskOrchestrator, StaggerSchedule};
pub use providers::{LlmProvider, ProviderError, ProviderRegistry};
pub use resilience::{LlmUsage, RetryPolicy};
pub use synthesizer::{DecisionPolicy, Stance, Synthesizer};

/// Errors from building or driving the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Analysis cancelled")]
    Cancelled,
}
