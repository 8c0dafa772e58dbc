//! Console rendering for the CLI.

use std::time::Duration;

use realitycheck_core::{Dimension, ScoreOutcome, WeightedRiskInput};
use realitycheck_runtime::AnalysisOutcome;

const RULE: &str = "===========================================";

pub fn header(idea: &str, provider: &str) {
    println!("{}", RULE);
    println!("REALITY CHECK");
    println!("{}", RULE);
    println!("Analyzing: \"{}\"", idea);
    println!("Provider: {}", provider);
}

pub fn outcome(outcome: &AnalysisOutcome, elapsed: Duration) {
    println!("\nAnalysis completed in {:.2}s", elapsed.as_secs_f64());
    println!("{}", RULE);

    match &outcome.verdict {
        Some(verdict) => {
            println!("VERDICT: {}", verdict.verdict);
            println!("Success Probability: {}%", verdict.success_probability);

            println!("\nTop Failure Modes:");
            for mode in &verdict.top_failure_modes {
                println!("- {}", mode);
            }

            println!("\nImprovement Actions:");
            for action in &verdict.improvement_actions {
                println!("- {}", action);
            }
        }
        None => {
            eprintln!(
                "Failed to generate verdict: {}",
                outcome.synthesis_error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    println!("\n--- Score ---");
    println!("Computed Probability: {}%", outcome.score.probability);
    println!("{}", outcome.score.rationale);

    println!("\n--- Detail ---");
    for dimension in Dimension::ALL {
        match outcome.analysis.get(dimension) {
            Some(report) => println!(
                "{:<22} {:>3}  (confidence {}%)",
                dimension.label(),
                report.risk_score,
                report.confidence
            ),
            None => println!("{:<22} N/A", dimension.label()),
        }
    }

    if !outcome.analysis.errors.is_empty() {
        println!("\n--- Agent Failures ---");
        for error in &outcome.analysis.errors {
            println!("- {}", error);
        }
    }

    println!(
        "\nUsage: {} calls, {} tokens, ~${:.4}",
        outcome.usage.llm_calls, outcome.usage.total_tokens, outcome.usage.estimated_cost
    );
}

pub fn score(inputs: &[WeightedRiskInput], outcome: &ScoreOutcome) {
    for input in inputs {
        println!("{:<12} {:>3}  x{:.1}", input.name, input.score, input.weight);
    }
    println!("{}", RULE);
    println!("Success Probability: {}%", outcome.probability);
    println!("{}", outcome.rationale);
}

pub fn prompt(title: &str, text: &str) {
    println!("### {}", title);
    println!("{}", text);
    println!();
}
