//! Agent descriptors.

use serde::{Deserialize, Serialize};

/// Immutable description of one agent: who it is and how it must answer.
///
/// The spec is rendered into the system prompt on every call, so the same
/// spec always produces the same prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Display name, e.g. "Market Reality Agent"
    pub name: String,

    /// One-line persona
    pub role: String,

    /// What the agent is responsible for
    pub description: String,

    /// Ordered instructions rendered as a bulleted list
    pub instructions: Vec<String>,

    /// Textual shape of the expected JSON output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_description: Option<String>,
}

impl AgentSpec {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            description: description.into(),
            instructions: Vec::new(),
            schema_description: None,
        }
    }

    /// Append one instruction.
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Append several instructions in order.
    pub fn instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions
            .extend(instructions.into_iter().map(Into::into));
        self
    }

    /// Set the schema description shown to the backend.
    pub fn schema_description(mut self, description: impl Into<String>) -> Self {
        self.schema_description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_instruction_order() {
        let spec = AgentSpec::new("Test Agent", "Tester", "Tests things")
            .instruction("first")
            .instructions(["second", "third"])
            .schema_description("{}");

        assert_eq!(spec.instructions, vec!["first", "second", "third"]);
        assert_eq!(spec.schema_description.as_deref(), Some("{}"));
    }
}
