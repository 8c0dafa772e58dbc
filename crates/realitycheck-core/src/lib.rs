//! # realitycheck-core
//!
//! Deterministic building blocks for Reality Check.
//!
//! This crate answers, without any network access:
//! - What shape must an agent's output have to be accepted?
//! - How do five risk scores become one success probability?
//! - What does the synthesis agent get to read?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: scoring is a pure function, same input, same output
//! 2. **No LLM calls**: everything here is plain data and validation
//! 3. **Strict contracts**: agent output is parsed, schema-checked and typed
//!
//! ## Example
//!
//! ```rust
//! use realitycheck_core::{score, WeightedRiskInput};
//!
//! let outcome = score(&[
//!     WeightedRiskInput::new("Market", 90, 1.2),
//!     WeightedRiskInput::new("Execution", 90, 1.0),
//! ]);
//! assert_eq!(outcome.probability, 5);
//! ```

pub mod brief;
pub mod schema;
pub mod scoring;
pub mod types;

// Re-export main types at crate root
pub use brief::synthesis_brief;
pub use schema::{
    parse_json_output, strip_code_fences, OutputSchema, RiskReportSchema, SchemaViolation,
    VerdictReportSchema,
};
pub use scoring::{
    inputs_from_report, score, AbsentDimensionPolicy, ScoreOutcome, ScoringWeights,
    WeightedRiskInput,
};
pub use types::{AggregatedReport, Dimension, RiskReport, Verdict, VerdictReport};
