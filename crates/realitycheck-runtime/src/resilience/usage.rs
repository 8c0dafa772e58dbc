//! Token usage accounting for agent calls.
//!
//! Usage travels inside each agent result and is summed at fan-in, so
//! concurrent agents never share a counter.

use serde::{Deserialize, Serialize};

use crate::providers::TokenUsage;

/// Accumulated LLM usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Total tokens used
    pub total_tokens: u32,

    /// Prompt/input tokens
    pub prompt_tokens: u32,

    /// Completion/output tokens
    pub completion_tokens: u32,

    /// Number of completed backend calls
    pub llm_calls: u32,

    /// Estimated cost in USD
    pub estimated_cost: f64,
}

impl LlmUsage {
    /// Add token usage from a provider response.
    pub fn add(&mut self, usage: &TokenUsage, model: &str) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens += usage.total();
        self.llm_calls += 1;
        self.estimated_cost += Self::estimate_cost(usage, model);
    }

    /// Fold another usage record into this one.
    pub fn merge(&mut self, other: &LlmUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.llm_calls += other.llm_calls;
        self.estimated_cost += other.estimated_cost;
    }

    fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
        // USD per million tokens
        let (input_rate, output_rate) = match model {
            m if m.contains("llama-3.1-8b") => (0.05, 0.08),
            m if m.contains("llama-3.3-70b") => (0.59, 0.79),
            m if m.contains("mixtral-8x7b") => (0.24, 0.24),
            m if m.contains("gemma2-9b") => (0.20, 0.20),
            _ => (0.59, 0.79),
        };

        let input_cost = (usage.prompt_tokens as f64 / 1_000_000.0) * input_rate;
        let output_cost = (usage.completion_tokens as f64 / 1_000_000.0) * output_rate;

        input_cost + output_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_counts_calls_and_tokens() {
        let mut usage = LlmUsage::default();
        let tokens = TokenUsage {
            prompt_tokens: 300,
            completion_tokens: 120,
        };

        usage.add(&tokens, "llama-3.3-70b-versatile");
        usage.add(&tokens, "llama-3.3-70b-versatile");

        assert_eq!(usage.llm_calls, 2);
        assert_eq!(usage.total_tokens, 840);
        assert_eq!(usage.prompt_tokens, 600);
    }

    #[test]
    fn test_cost_estimation() {
        let mut usage = LlmUsage::default();
        usage.add(
            &TokenUsage {
                prompt_tokens: 1_000_000,
                completion_tokens: 1_000_000,
            },
            "llama-3.3-70b-versatile",
        );
        assert!((usage.estimated_cost - 1.38).abs() < 1e-9);
    }

    #[test]
    fn test_merge() {
        let mut a = LlmUsage {
            total_tokens: 10,
            prompt_tokens: 6,
            completion_tokens: 4,
            llm_calls: 1,
            estimated_cost: 0.5,
        };
        let b = a.clone();
        a.merge(&b);
        assert_eq!(a.llm_calls, 2);
        assert_eq!(a.total_tokens, 20);
        assert!((a.estimated_cost - 1.0).abs() < 1e-12);
    }
}
