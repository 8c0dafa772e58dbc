//! Prompts for the risk agents and the synthesis agent.
//!
//! Two layers:
//! 1. Persona text per agent (role, description, instructions) - constant
//! 2. Rendering of an [`AgentSpec`] plus the raw input into chat messages
//!
//! Rendering is pure string assembly, so identical specs and inputs always
//! produce byte-identical prompts.

use realitycheck_core::schema::{RISK_REPORT_DESCRIPTION, VERDICT_REPORT_DESCRIPTION};
use realitycheck_core::Dimension;

use crate::agents::AgentSpec;

/// Output-format contract appended to every system prompt.
pub const OUTPUT_FORMAT_PROMPT: &str = "You must respond with valid JSON matching this schema. \
Do not output markdown code blocks, just the raw JSON.";

/// Instructions shared by every synthesis policy.
pub const SYNTHESIS_PREAMBLE: [&str; 2] = [
    "Review the findings from the 5 expert agents.",
    "A section marked absent means that expert failed to report. Do not read it as low risk.",
];

/// Closing instructions shared by every synthesis policy.
pub const SYNTHESIS_CLOSING: [&str; 2] = [
    "For 'improvement_actions', provide specific pivots or fixes, not generic advice like 'do market research'.",
    "List at most 3 'top_failure_modes', the most likely causes of death first.",
];

/// "Start from NO": the skeptical default.
pub const CONSERVATIVE_POLICY: [&str; 4] = [
    "Weigh risks heavily. If any single risk is 'fatal', the verdict should be KILL.",
    "Do NOT be optimistic. Start from NO, and only move to PROCEED if the evidence is overwhelming.",
    "Calculate 'success_probability' conservatively. (Most startups fail, so default is low).",
    "If the verdict is KILL, be brutally honest about why.",
];

/// Evidence-weighted stance with no built-in bias toward KILL.
pub const BALANCED_POLICY: [&str; 4] = [
    "Weigh each risk by its severity and by how confident the expert was.",
    "Choose PIVOT when the core problem is real but the proposed approach is weak.",
    "Choose PROCEED only when no risk is fatal and the strongest risks have a credible mitigation.",
    "Calibrate 'success_probability' against the expert risk scores rather than a fixed prior.",
];

/// Render the system prompt for an agent.
pub fn system_prompt(spec: &AgentSpec) -> String {
    let instructions = spec
        .instructions
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "You are the {}.\n**Role**: {}\n**Description**: {}\n\n**Instructions**:\n{}\n\n**Output Format**:\n{}",
        spec.name, spec.role, spec.description, instructions, OUTPUT_FORMAT_PROMPT
    );

    if let Some(schema) = &spec.schema_description {
        prompt.push_str("\nSchema Structure:\n");
        prompt.push_str(schema);
    }

    prompt
}

/// Render the user prompt. The input is embedded verbatim.
pub fn user_prompt(input: &str) -> String {
    format!("Analyze this idea: \"{}\"", input)
}

/// Built-in spec for a risk dimension.
pub fn dimension_spec(dimension: Dimension) -> AgentSpec {
    let spec = match dimension {
        Dimension::Market => AgentSpec::new(
            "Market Reality Agent",
            "Ruthless Market Analyst",
            "Evaluates the actual willingness of the market to pay, identifying saturation and fake demand.",
        )
        .instructions([
            "Ignore 'nice to have' features.",
            "Focus on who specifically has the budget and pain to pay for this.",
            "Identify existing competitors and why this idea might just be a feature for them.",
            "Scrutinize the distribution channel: how will users actually find this?",
            "Be pessimistic about viral growth.",
        ]),
        Dimension::Execution => AgentSpec::new(
            "Execution Complexity Agent",
            "Senior Engineering Architect",
            "Assesses the technical difficulty, hidden dependencies, and timeline realism.",
        )
        .instructions([
            "Assume the team is smaller and less experienced than needed.",
            "Identify hidden technical debts or 3rd party dependencies (APIs, platforms).",
            "Highlight 'unknown unknowns' in the tech stack.",
            "Estimate time-to-market conservatively (multiply user estimates by 3x).",
            "Flag any 'research grade' AI or tech that isn't production ready.",
        ]),
        Dimension::Behavioral => AgentSpec::new(
            "Human & Behavioral Risk Agent",
            "Behavioral Psychologist / UX Researcher",
            "Analyzes the friction of changing user habits and trust barriers.",
        )
        .instructions([
            "Humans are lazy. Identify where this requires effort to switch.",
            "Why will users NOT use this even if it works?",
            "Identify trust deficits (privacy, security, brand).",
            "Assess the 'cold start' problem: is it useful with 0 users?",
            "Look for 'vitamin vs painkiller' issues.",
        ]),
        Dimension::Timing => AgentSpec::new(
            "Timing & External Risk Agent",
            "Macro Strategist",
            "Evaluates market timing, regulations, and platform dependencies.",
        )
        .instructions([
            "Is it too early (market not ready) or too late (saturated)?",
            "Are there legal or regulatory hurdles (GDPR, AI Act, Finance)?",
            "Does this rely on a platform (Twitter/X, OpenAI) that could kill it overnight?",
            "Are there macro-economic headwinds (recession, funding drying up)?",
            "Check for 'solution in search of a problem' timing.",
        ]),
        Dimension::Historical => AgentSpec::new(
            "Historical Pattern Agent",
            "Startup Historian",
            "Compares against failed and successful startups in the same space.",
        )
        .instructions([
            "Identify dead startups that tried this exact thing.",
            "Why did they fail? (Funding, Unit Economics, Timing?)",
            "Is the 'differentiation' actually defensible or just a gimmick?",
            "Pattern match against classic failure modes (e.g. 'Uber for X', 'Social Network for Y').",
            "Be skeptical of 'this time it's different'.",
        ]),
    };

    spec.schema_description(RISK_REPORT_DESCRIPTION)
}

/// Spec for the synthesis agent with the given decision instructions.
pub fn synthesis_spec<I, S>(policy_instructions: I) -> AgentSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    AgentSpec::new(
        "Synthesis Agent",
        "Chief Decision Officer / VC Partner",
        "Synthesizes multiple expert reports into a final investment decision.",
    )
    .instructions(SYNTHESIS_PREAMBLE)
    .instructions(policy_instructions)
    .instructions(SYNTHESIS_CLOSING)
    .schema_description(VERDICT_REPORT_DESCRIPTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_layout() {
        let spec = AgentSpec::new("Test Agent", "Tester", "Checks layout")
            .instructions(["one", "two"])
            .schema_description("{\"x\": \"number\"}");

        let prompt = system_prompt(&spec);

        assert!(prompt.starts_with("You are the Test Agent.\n**Role**: Tester\n"));
        assert!(prompt.contains("**Instructions**:\n- one\n- two\n"));
        assert!(prompt.contains(OUTPUT_FORMAT_PROMPT));
        assert!(prompt.ends_with("Schema Structure:\n{\"x\": \"number\"}"));
    }

    #[test]
    fn test_system_prompt_without_schema() {
        let prompt = system_prompt(&AgentSpec::new("A", "B", "C"));
        assert!(!prompt.contains("Schema Structure"));
        assert!(prompt.ends_with("just the raw JSON."));
    }

    #[test]
    fn test_system_prompt_is_deterministic() {
        let spec = dimension_spec(Dimension::Market);
        assert_eq!(system_prompt(&spec), system_prompt(&spec));
    }

    #[test]
    fn test_user_prompt_embeds_input_verbatim() {
        assert_eq!(
            user_prompt("AI for \"dogs\""),
            "Analyze this idea: \"AI for \"dogs\"\""
        );
    }

    #[test]
    fn test_every_dimension_has_a_spec() {
        for dimension in Dimension::ALL {
            let spec = dimension_spec(dimension);
            assert_eq!(spec.instructions.len(), 5, "{}", dimension);
            assert!(spec.name.ends_with("Agent"));
            assert_eq!(spec.schema_description.as_deref(), Some(RISK_REPORT_DESCRIPTION));
        }
    }

    #[test]
    fn test_synthesis_spec_wraps_policy() {
        let spec = synthesis_spec(CONSERVATIVE_POLICY);
        assert_eq!(spec.instructions.first().map(String::as_str), Some(SYNTHESIS_PREAMBLE[0]));
        assert!(spec.instructions.iter().any(|i| i.contains("Start from NO")));
        assert_eq!(spec.instructions.last().map(String::as_str), Some(SYNTHESIS_CLOSING[1]));
    }
}
