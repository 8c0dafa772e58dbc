//! Shared contracts between the risk agents, the scoring engine and the
//! synthesis step.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the five independent analysis axes.
///
/// The declaration order is the canonical order: it fixes the stagger slot
/// of each agent, the order of failure messages and the order of sections in
/// the synthesis brief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Market,
    Execution,
    Behavioral,
    Timing,
    Historical,
}

impl Dimension {
    /// All dimensions in canonical order.
    pub const ALL: [Dimension; 5] = [
        Dimension::Market,
        Dimension::Execution,
        Dimension::Behavioral,
        Dimension::Timing,
        Dimension::Historical,
    ];

    /// Section label used in reports and the synthesis brief.
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Market => "Market Reality",
            Dimension::Execution => "Execution Complexity",
            Dimension::Behavioral => "Human & Behavioral",
            Dimension::Timing => "Timing & External",
            Dimension::Historical => "Historical Pattern",
        }
    }

    /// Short name used for scoring inputs and failure messages.
    pub fn short_name(&self) -> &'static str {
        match self {
            Dimension::Market => "Market",
            Dimension::Execution => "Execution",
            Dimension::Behavioral => "Behavioral",
            Dimension::Timing => "Timing",
            Dimension::Historical => "History",
        }
    }

    /// Position in the canonical order.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(Dimension::Market),
            "execution" => Ok(Dimension::Execution),
            "behavioral" | "behavioural" => Ok(Dimension::Behavioral),
            "timing" => Ok(Dimension::Timing),
            "historical" | "history" => Ok(Dimension::Historical),
            other => Err(format!(
                "unknown dimension '{}': expected market, execution, behavioral, timing or historical",
                other
            )),
        }
    }
}

/// Output of one risk agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskReport {
    /// 0-100, higher is riskier
    #[serde(deserialize_with = "crate::schema::whole_number")]
    pub risk_score: u8,

    /// Critical findings (at least one)
    pub key_findings: Vec<String>,

    /// Non-obvious risks
    pub hidden_risks: Vec<String>,

    /// 0-100 confidence of the agent in its own analysis
    #[serde(deserialize_with = "crate::schema::whole_number")]
    pub confidence: u8,
}

/// Final categorical decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Kill,
    Pivot,
    Proceed,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Kill => "KILL",
            Verdict::Pivot => "PIVOT",
            Verdict::Proceed => "PROCEED",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the synthesis agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictReport {
    /// 5-90
    #[serde(deserialize_with = "crate::schema::whole_number")]
    pub success_probability: u8,

    pub verdict: Verdict,

    /// At most three entries
    pub top_failure_modes: Vec<String>,

    pub improvement_actions: Vec<String>,
}

/// Fan-in of the five risk agents.
///
/// A dimension is `None` when its agent failed; the failure message is then
/// recorded in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub market: Option<RiskReport>,
    pub execution: Option<RiskReport>,
    pub behavioral: Option<RiskReport>,
    pub timing: Option<RiskReport>,
    pub historical: Option<RiskReport>,

    /// Failure messages in dimension order
    pub errors: Vec<String>,

    /// Last raw backend text seen per dimension, kept for audit
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub raw_outputs: BTreeMap<Dimension, String>,
}

impl AggregatedReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report for a dimension, if its agent succeeded.
    pub fn get(&self, dimension: Dimension) -> Option<&RiskReport> {
        match dimension {
            Dimension::Market => self.market.as_ref(),
            Dimension::Execution => self.execution.as_ref(),
            Dimension::Behavioral => self.behavioral.as_ref(),
            Dimension::Timing => self.timing.as_ref(),
            Dimension::Historical => self.historical.as_ref(),
        }
    }

    /// Store the report for a dimension.
    pub fn set(&mut self, dimension: Dimension, report: RiskReport) {
        let slot = match dimension {
            Dimension::Market => &mut self.market,
            Dimension::Execution => &mut self.execution,
            Dimension::Behavioral => &mut self.behavioral,
            Dimension::Timing => &mut self.timing,
            Dimension::Historical => &mut self.historical,
        };
        *slot = Some(report);
    }

    /// Record a failed dimension.
    pub fn record_failure(&mut self, dimension: Dimension, message: impl fmt::Display) {
        self.errors
            .push(format!("{} Agent: {}", dimension.short_name(), message));
    }

    /// Dimensions that produced a report, in canonical order.
    pub fn present_dimensions(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.get(*d).is_some())
            .collect()
    }

    /// Dimensions whose agent failed, in canonical order.
    pub fn failed_dimensions(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.get(*d).is_none())
            .collect()
    }

    /// True if at least one, but not necessarily every, dimension is missing.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty() || Dimension::ALL.iter().any(|d| self.get(*d).is_none())
    }
}
