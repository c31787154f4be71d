//! The preset teaching roster.
//!
//! Three agents cycle in fixed order: a course generator drafts, a student
//! reviewer critiques (its APPROVE ends the run), and a file handler saves
//! approved content with the sandboxed file tools.

use colloquy_core::provider::Provider;
use colloquy_core::spec::AgentSpec;
use colloquy_core::tool::ToolRegistry;
use colloquy_team::{Agent, TerminationCondition};
use std::sync::Arc;

pub const GENERATOR: &str = "generator";
pub const REVIEWER: &str = "reviewer";
pub const FILE_HANDLER: &str = "file_handler";

const GENERATOR_DIRECTIVE: &str = "\
You are a course generator. Draft concise, well-structured course content \
for the topic you are given. When the reviewer asks for changes, revise and \
present the full updated draft. Once the reviewer approves, ask the file \
handler to save the final content, naming the file after the topic. Never \
use the word APPROVE yourself.";

const REVIEWER_DIRECTIVE: &str = "\
You are a student reviewing course content. Point out what is unclear, \
missing, or too advanced, and ask for concrete changes. Be brief. When the \
content is good enough to study from, reply with the single word APPROVE.";

const FILE_HANDLER_DIRECTIVE: &str = "\
You handle file storage. When asked to save content, invoke the write tool \
with a filename and the exact content to store; when asked to retrieve a \
file, invoke the read tool. Afterwards, state plainly what you did and \
which file was involved. Do not edit content yourself.";

/// Build the three teaching agents against one backend and model.
///
/// Each agent holds its own handle to the shared provider; the file handler
/// declares every tool in the registry.
pub fn teaching_team(
    provider: Arc<dyn Provider>,
    model: &str,
    registry: &ToolRegistry,
) -> Vec<Agent> {
    vec![
        Agent::new(
            AgentSpec::new(GENERATOR, GENERATOR_DIRECTIVE),
            provider.clone(),
            model,
        ),
        Agent::new(
            AgentSpec::new(REVIEWER, REVIEWER_DIRECTIVE),
            provider.clone(),
            model,
        )
        .with_temperature(0.3),
        Agent::new(
            AgentSpec::new(FILE_HANDLER, FILE_HANDLER_DIRECTIVE)
                .with_tools(registry.definitions()),
            provider,
            model,
        )
        .with_temperature(0.0),
    ]
}

/// The run ends when the reviewer approves; mentions by anyone else are
/// conversation, not a verdict.
pub fn approval_condition() -> TerminationCondition {
    TerminationCondition::mention_by("APPROVE", REVIEWER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use colloquy_core::error::ProviderError;
    use colloquy_core::provider::{ProviderRequest, ProviderResponse};
    use colloquy_core::transcript::Message;

    struct SilentProvider;

    #[async_trait]
    impl Provider for SilentProvider {
        fn name(&self) -> &str {
            "silent"
        }
        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("test provider".into()))
        }
    }

    #[test]
    fn only_the_file_handler_invokes_tools() {
        let registry = ToolRegistry::new();
        let roster = teaching_team(Arc::new(SilentProvider), "m", &registry);

        assert_eq!(roster.len(), 3);
        assert!(!roster[0].spec().capabilities.can_invoke_tools);
        assert!(!roster[1].spec().capabilities.can_invoke_tools);
        assert!(roster[2].spec().capabilities.can_invoke_tools);
    }

    #[test]
    fn approval_is_scoped_to_the_reviewer() {
        let condition = approval_condition();
        assert!(!condition.matches(&Message::text(GENERATOR, "please APPROVE this")));
        assert!(condition.matches(&Message::text(REVIEWER, "APPROVE")));
    }
}
