//! Scoring engine: turns per-dimension risk scores into a success probability.
//!
//! The engine is a pure function:
//! 1. Weighted risk is the weight-normalized mean of the scores
//! 2. A single penalty tier applies: any score > 85 costs 15 points, else any
//!    score > 70 costs 10 points. Tiers never add up.
//! 3. `probability = clamp(100 - weighted_risk - penalty, 5, 90)`, rounded
//!    half away from zero (`f64::round`).
//!
//! Same input, same output, bit for bit.

use serde::{Deserialize, Serialize};

use crate::types::{AggregatedReport, Dimension};

/// Lowest probability the engine reports.
pub const MIN_PROBABILITY: f64 = 5.0;

/// Highest probability the engine reports.
pub const MAX_PROBABILITY: f64 = 90.0;

/// Probability returned when there is nothing to score.
pub const FALLBACK_PROBABILITY: u8 = 50;

const SEVERE_THRESHOLD: u8 = 85;
const SEVERE_PENALTY: u8 = 15;
const HIGH_THRESHOLD: u8 = 70;
const HIGH_PENALTY: u8 = 10;

/// One scored dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedRiskInput {
    pub name: String,

    /// 0-100
    pub score: u8,

    /// Relative importance, positive
    pub weight: f64,
}

impl WeightedRiskInput {
    pub fn new(name: impl Into<String>, score: u8, weight: f64) -> Self {
        Self {
            name: name.into(),
            score,
            weight,
        }
    }
}

/// Result of scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    /// Success probability, 5-90 (50 when nothing was scored)
    pub probability: u8,

    /// Weight-normalized mean risk before penalties
    pub weighted_risk: f64,

    /// Penalty tier applied (0, 10 or 15)
    pub penalty: u8,

    /// Human-readable explanation
    pub rationale: String,
}

/// Per-dimension weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub market: f64,
    pub execution: f64,
    pub behavioral: f64,
    pub timing: f64,
    pub historical: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            market: 1.2,
            execution: 1.0,
            behavioral: 1.0,
            timing: 0.8,
            historical: 0.8,
        }
    }
}

impl ScoringWeights {
    pub fn weight(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Market => self.market,
            Dimension::Execution => self.execution,
            Dimension::Behavioral => self.behavioral,
            Dimension::Timing => self.timing,
            Dimension::Historical => self.historical,
        }
    }

    /// Name of the first dimension whose weight is not a positive finite number.
    pub fn first_invalid(&self) -> Option<Dimension> {
        Dimension::ALL
            .into_iter()
            .find(|d| !(self.weight(*d).is_finite() && self.weight(*d) > 0.0))
    }
}

/// How a failed (absent) dimension enters the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentDimensionPolicy {
    /// Score 0, "no risk found". Optimistic.
    #[default]
    AssumeNoRisk,

    /// Leave the dimension out of the weighted mean.
    Exclude,

    /// Score 100. Pessimistic.
    AssumeWorstCase,
}

/// Build scoring inputs from an aggregated report, in dimension order.
pub fn inputs_from_report(
    report: &AggregatedReport,
    weights: &ScoringWeights,
    policy: AbsentDimensionPolicy,
) -> Vec<WeightedRiskInput> {
    Dimension::ALL
        .into_iter()
        .filter_map(|dimension| {
            let score = match (report.get(dimension), policy) {
                (Some(r), _) => r.risk_score,
                (None, AbsentDimensionPolicy::AssumeNoRisk) => 0,
                (None, AbsentDimensionPolicy::AssumeWorstCase) => 100,
                (None, AbsentDimensionPolicy::Exclude) => return None,
            };
            Some(WeightedRiskInput::new(
                dimension.short_name(),
                score,
                weights.weight(dimension),
            ))
        })
        .collect()
}

/// Compute the success probability for a set of weighted risk scores.
pub fn score(inputs: &[WeightedRiskInput]) -> ScoreOutcome {
    let total_weight: f64 = inputs.iter().map(|i| i.weight).sum();

    if inputs.is_empty() || !(total_weight.is_finite() && total_weight > 0.0) {
        return ScoreOutcome {
            probability: FALLBACK_PROBABILITY,
            weighted_risk: 0.0,
            penalty: 0,
            rationale: "No valid scores".to_string(),
        };
    }

    let weighted_sum: f64 = inputs.iter().map(|i| f64::from(i.score) * i.weight).sum();
    let weighted_risk = weighted_sum / total_weight;
    let penalty = penalty_for(inputs);

    let probability = (100.0 - weighted_risk - f64::from(penalty))
        .clamp(MIN_PROBABILITY, MAX_PROBABILITY)
        .round() as u8;

    tracing::debug!(weighted_risk, penalty, probability, "Scored risk inputs");

    ScoreOutcome {
        probability,
        weighted_risk,
        penalty,
        rationale: format!(
            "Base risk: {}%. Penalties: {}%. Final: {}%",
            weighted_risk.round(),
            penalty,
            probability
        ),
    }
}

/// Worst penalty tier crossed by any input.
pub fn penalty_for(inputs: &[WeightedRiskInput]) -> u8 {
    let worst = inputs.iter().map(|i| i.score).max().unwrap_or(0);
    if worst > SEVERE_THRESHOLD {
        SEVERE_PENALTY
    } else if worst > HIGH_THRESHOLD {
        HIGH_PENALTY
    } else {
        0
    }
}
