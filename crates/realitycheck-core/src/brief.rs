//! Synthesis brief: the textual rendering of an [`AggregatedReport`] that the
//! synthesis agent reviews.

use std::fmt::Write as _;

use crate::types::{AggregatedReport, Dimension, RiskReport};

/// Marker opening the expert reports.
pub const REPORTS_START: &str = "--- EXPERT REPORTS ---";

/// Marker closing the expert reports.
pub const REPORTS_END: &str = "--- END REPORTS ---";

/// Render the brief for an idea and its aggregated reports.
///
/// Every dimension gets a labeled section in canonical order. A failed
/// dimension is printed as absent rather than skipped, so the reviewer can
/// see what is missing.
pub fn synthesis_brief(idea: &str, report: &AggregatedReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Idea: \"{}\"", idea);
    out.push('\n');
    out.push_str(REPORTS_START);
    out.push('\n');

    for dimension in Dimension::ALL {
        out.push('\n');
        let _ = writeln!(out, "[{}]", dimension.label());
        match report.get(dimension) {
            Some(r) => write_section(&mut out, r),
            None => {
                let _ = writeln!(out, "Status: absent (agent failed)");
            }
        }
    }

    out.push('\n');
    out.push_str(REPORTS_END);
    out.push('\n');
    out
}

fn write_section(out: &mut String, report: &RiskReport) {
    let _ = writeln!(out, "Risk Score: {}", report.risk_score);
    let _ = writeln!(out, "Findings: {}", json_list(&report.key_findings));
    let _ = writeln!(out, "Hidden Risks: {}", json_list(&report.hidden_risks));
}

fn json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}
