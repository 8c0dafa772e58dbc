//! Output schemas for agent responses.
//!
//! Agent output is accepted only if it parses as JSON, validates against the
//! embedded JSON Schema document, and then decodes into the typed report.
//! Parsing and schema validation are separate steps so callers can tell the
//! two failures apart.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

use crate::types::{RiskReport, VerdictReport};

const RISK_REPORT_SCHEMA_JSON: &str = include_str!("../schemas/risk_report.schema.json");
const VERDICT_REPORT_SCHEMA_JSON: &str = include_str!("../schemas/verdict_report.schema.json");

static RISK_REPORT_VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
static VERDICT_REPORT_VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"```(?:json)?").expect("Invalid regex");
}

/// Schema description shown to risk agents.
pub const RISK_REPORT_DESCRIPTION: &str = r#"{
  "risk_score": "number (0-100)",
  "key_findings": "array of strings",
  "hidden_risks": "array of strings",
  "confidence": "number (0-100)"
}"#;

/// Schema description shown to the synthesis agent.
pub const VERDICT_REPORT_DESCRIPTION: &str = r#"{
  "success_probability": "number (5-90)",
  "verdict": "string ('KILL', 'PIVOT', 'PROCEED')",
  "top_failure_modes": "array of strings (max 3)",
  "improvement_actions": "array of strings"
}"#;

/// Errors from schema validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaViolation {
    #[error("Failed to load schema: {0}")]
    LoadError(String),

    #[error("{schema} constraints violated: {}", .errors.join("; "))]
    Constraints {
        schema: &'static str,
        errors: Vec<String>,
    },

    #[error("{schema} could not be decoded: {message}")]
    Decode {
        schema: &'static str,
        message: String,
    },
}

/// A structural contract an agent's JSON output must satisfy.
pub trait OutputSchema: Send + Sync {
    /// The typed value produced by a successful validation.
    type Output: Send + 'static;

    /// Schema name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Textual description of the expected shape, embedded in prompts.
    fn description(&self) -> &'static str;

    /// Check a parsed JSON value and convert it into the typed output.
    fn validate(&self, value: &Value) -> Result<Self::Output, SchemaViolation>;
}

/// Schema for [`RiskReport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskReportSchema;

impl OutputSchema for RiskReportSchema {
    type Output = RiskReport;

    fn name(&self) -> &'static str {
        "RiskReport"
    }

    fn description(&self) -> &'static str {
        RISK_REPORT_DESCRIPTION
    }

    fn validate(&self, value: &Value) -> Result<RiskReport, SchemaViolation> {
        let validator = compiled(&RISK_REPORT_VALIDATOR, RISK_REPORT_SCHEMA_JSON)?;
        check_and_decode(validator, self.name(), value)
    }
}

/// Schema for [`VerdictReport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct VerdictReportSchema;

impl OutputSchema for VerdictReportSchema {
    type Output = VerdictReport;

    fn name(&self) -> &'static str {
        "VerdictReport"
    }

    fn description(&self) -> &'static str {
        VERDICT_REPORT_DESCRIPTION
    }

    fn validate(&self, value: &Value) -> Result<VerdictReport, SchemaViolation> {
        let validator = compiled(&VERDICT_REPORT_VALIDATOR, VERDICT_REPORT_SCHEMA_JSON)?;
        check_and_decode(validator, self.name(), value)
    }
}

/// Get or initialize a compiled schema validator.
fn compiled(
    cell: &'static OnceLock<Result<jsonschema::Validator, String>>,
    document: &'static str,
) -> Result<&'static jsonschema::Validator, SchemaViolation> {
    let result = cell.get_or_init(|| {
        let schema_value: Value = match serde_json::from_str(document) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaViolation::LoadError(e.clone())),
    }
}

fn check_and_decode<T: DeserializeOwned>(
    validator: &jsonschema::Validator,
    schema: &'static str,
    value: &Value,
) -> Result<T, SchemaViolation> {
    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if !errors.is_empty() {
        return Err(SchemaViolation::Constraints { schema, errors });
    }

    T::deserialize(value).map_err(|e| SchemaViolation::Decode {
        schema,
        message: e.to_string(),
    })
}

/// Remove markdown code fences some models wrap around JSON output.
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// Strip code fences and parse the remainder as JSON.
pub fn parse_json_output(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&strip_code_fences(raw))
}

/// Accept integral numbers even when written with a zero fraction (`72.0`).
pub(crate) fn whole_number<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&value) {
        return Err(D::Error::custom(format!(
            "expected a whole number between 0 and 255, got {}",
            value
        )));
    }
    Ok(value as u8)
}
