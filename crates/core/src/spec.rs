//! Agent specifications — policy as data.
//!
//! Every participant is the same concrete agent type; what distinguishes a
//! course generator from a reviewer is the `AgentSpec` it carries: role
//! directive, capability flags, and declared tools. Specs are built at team
//! construction and immutable for the run.

use crate::provider::ToolDefinition;
use crate::transcript::AgentId;
use serde::{Deserialize, Serialize};

/// What an agent is allowed to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// May produce plain text responses.
    pub can_emit_text: bool,

    /// May request tool invocations.
    pub can_invoke_tools: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            can_emit_text: true,
            can_invoke_tools: false,
        }
    }
}

/// Immutable configuration of one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique id within the roster.
    pub id: AgentId,

    /// Static role directive used as the agent's system prompt.
    pub role_directive: String,

    /// Capability flags.
    pub capabilities: Capabilities,

    /// Tools this agent declares (name + argument schema), empty unless
    /// `can_invoke_tools` is set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl AgentSpec {
    /// A text-only agent with the given id and role directive.
    pub fn new(id: impl Into<AgentId>, role_directive: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role_directive: role_directive.into(),
            capabilities: Capabilities::default(),
            tools: Vec::new(),
        }
    }

    /// Declare tools for this agent and enable tool invocation.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.capabilities.can_invoke_tools = true;
        self.tools = tools;
        self
    }

    /// Whether this agent declares a tool with the given name.
    pub fn declares_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capabilities_are_text_only() {
        let spec = AgentSpec::new("writer", "You write things.");
        assert!(spec.capabilities.can_emit_text);
        assert!(!spec.capabilities.can_invoke_tools);
        assert!(spec.tools.is_empty());
    }

    #[test]
    fn with_tools_enables_invocation() {
        let spec = AgentSpec::new("file_handler", "You manage files.").with_tools(vec![
            ToolDefinition {
                name: "read".into(),
                description: "Read a file".into(),
                parameters: serde_json::json!({ "type": "object" }),
            },
        ]);
        assert!(spec.capabilities.can_invoke_tools);
        assert!(spec.declares_tool("read"));
        assert!(!spec.declares_tool("write"));
    }
}
