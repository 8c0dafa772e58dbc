//! Runtime configuration.
//!
//! Every tunable of the pipeline lives here and loads from YAML. All fields
//! default, so an empty document is a valid configuration:
//!
//! ```yaml
//! provider:
//!   type: groq
//!   options:
//!     base_url: https://api.groq.com/openai/v1
//! completion:
//!   model: llama-3.3-70b-versatile
//!   temperature: 0.1
//!   timeout: 60s
//! retry:
//!   retry_budget: 1
//!   rate_limit_delay: 10s
//! stagger: [0s, 2s, 4s, 6s, 8s]
//! scoring:
//!   absent_dimension: assume_no_risk
//! decision_policy:
//!   stance: conservative
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use thiserror::Error;

use realitycheck_core::{AbsentDimensionPolicy, Dimension, ScoringWeights};

use crate::orchestrator::StaggerSchedule;
use crate::providers::CompletionConfig;
use crate::resilience::RetryPolicy;
use crate::synthesizer::DecisionPolicy;

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which backend to build and its provider-specific options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider type registered in the provider registry, e.g. "groq"
    #[serde(rename = "type")]
    pub kind: String,

    /// Options handed to the provider factory
    #[serde(default = "empty_options")]
    pub options: JsonValue,
}

fn empty_options() -> JsonValue {
    JsonValue::Object(Default::default())
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: "groq".to_string(),
            options: empty_options(),
        }
    }
}

/// Scoring inputs that are not part of the agent output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub absent_dimension: AbsentDimensionPolicy,
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub provider: ProviderSettings,
    pub completion: CompletionConfig,
    pub retry: RetryPolicy,
    pub stagger: StaggerSchedule,
    pub scoring: ScoringConfig,
    pub decision_policy: DecisionPolicy,
}

impl RuntimeConfig {
    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stagger.len() != Dimension::ALL.len() {
            return Err(ConfigError::Invalid(format!(
                "stagger must list {} delays, one per risk dimension, got {}",
                Dimension::ALL.len(),
                self.stagger.len()
            )));
        }

        if let Some(dimension) = self.scoring.weights.first_invalid() {
            return Err(ConfigError::Invalid(format!(
                "weight for {} must be a positive number",
                dimension
            )));
        }

        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.completion.temperature
            )));
        }

        if self.completion.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "max_tokens must be greater than zero".to_string(),
            ));
        }

        // The HTTP client enforces completion.timeout; call_timeout is the outer deadline.
        if let Some(call_timeout) = self.retry.call_timeout {
            if call_timeout < self.completion.timeout {
                return Err(ConfigError::Invalid(format!(
                    "retry.call_timeout ({}) must not be shorter than completion.timeout ({})",
                    humantime::format_duration(call_timeout),
                    humantime::format_duration(self.completion.timeout)
                )));
            }
        }

        if self.decision_policy.instructions().is_empty() {
            return Err(ConfigError::Invalid(
                "decision policy must carry at least one instruction".to_string(),
            ));
        }

        Ok(())
    }
}

/// Serde adapter for durations written as human-readable strings ("10s", "1m 30s").
pub mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }

    /// Same format for `Option<Duration>`; `null` means no duration.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.collect_str(&humantime::format_duration(*d)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|text| humantime::parse_duration(&text).map_err(serde::de::Error::custom))
                .transpose()
        }
    }

    /// Same format for a list of durations.
    pub mod list {
        use serde::ser::SerializeSeq;
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut seq = serializer.serialize_seq(Some(durations.len()))?;
            for d in durations {
                seq.serialize_element(&humantime::format_duration(*d).to_string())?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Vec::<String>::deserialize(deserializer)?
                .iter()
                .map(|text| humantime::parse_duration(text).map_err(serde::de::Error::custom))
                .collect()
        }
    }
}
