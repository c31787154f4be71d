//! The concrete conversational agent.
//!
//! There is exactly one agent type; role-specialized behavior comes from the
//! `AgentSpec` it carries. Given the shared transcript, an agent produces a
//! lazy stream of text deltas from its backend — it never appends to the
//! transcript itself.

use colloquy_core::error::ProviderError;
use colloquy_core::provider::{ChatMessage, Provider, ProviderRequest, StreamChunk};
use colloquy_core::spec::AgentSpec;
use colloquy_core::transcript::{AgentId, MessageKind, Transcript};
use std::sync::Arc;
use tracing::debug;

pub struct Agent {
    spec: AgentSpec,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl Agent {
    /// Create an agent from its spec and backend.
    pub fn new(spec: AgentSpec, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            spec,
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens per response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn id(&self) -> &AgentId {
        &self.spec.id
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    /// Flatten the shared transcript into this agent's point of view:
    /// its own messages become assistant turns, everything else becomes
    /// named user lines, the role directive is the system prompt.
    fn build_request(&self, transcript: &Transcript) -> ProviderRequest {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(ChatMessage::system(&self.spec.role_directive));

        for msg in transcript.messages() {
            if msg.speaker == self.spec.id && msg.kind != MessageKind::ToolResult {
                messages.push(ChatMessage::assistant(&msg.content));
            } else {
                messages.push(ChatMessage::user(format!(
                    "{}: {}",
                    msg.speaker, msg.content
                )));
            }
        }

        let tools = if self.spec.capabilities.can_invoke_tools {
            self.spec.tools.clone()
        } else {
            Vec::new()
        };

        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools,
        }
    }

    /// Ask the backend for this agent's next contribution.
    ///
    /// Returns the backend's delta stream; the aggregator reassembles it.
    /// A failure here (before the first delta) surfaces to the coordinator,
    /// which records it as an Error message rather than crashing the loop.
    pub async fn respond(
        &self,
        transcript: &Transcript,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let request = self.build_request(transcript);
        debug!(
            agent = %self.spec.id,
            provider = self.provider.name(),
            messages = request.messages.len(),
            "Requesting response"
        );
        self.provider.stream(request).await
    }
}
