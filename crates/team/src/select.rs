//! Speaker selection — who talks next.
//!
//! Strategies are interchangeable behind the `Selector` trait. A selection
//! outside the roster is a coordination bug and fatal to the run; it is
//! never silently remapped.

use async_trait::async_trait;
use colloquy_core::error::TeamError;
use colloquy_core::provider::{ChatMessage, Provider, ProviderRequest};
use colloquy_core::spec::AgentSpec;
use colloquy_core::transcript::{AgentId, Transcript};
use std::sync::Arc;
use tracing::debug;

/// Chooses the next speaker for each turn.
#[async_trait]
pub trait Selector: Send {
    /// Pick the speaker for turn `turn` (0-based) from `roster`.
    ///
    /// The returned id must name a roster member; anything else halts the
    /// run with `InvalidSelection`.
    async fn next_speaker(
        &mut self,
        transcript: &Transcript,
        roster: &[AgentSpec],
        turn: u64,
    ) -> Result<AgentId, TeamError>;

    /// Check roster-dependent configuration at team construction.
    fn validate(&self, _roster: &[AgentSpec]) -> Result<(), TeamError> {
        Ok(())
    }

    /// Clear any per-run state before a fresh run.
    fn reset(&mut self) {}
}

/// Cycles through the roster in declaration order, one agent per turn.
pub struct FixedOrder;

#[async_trait]
impl Selector for FixedOrder {
    async fn next_speaker(
        &mut self,
        _transcript: &Transcript,
        roster: &[AgentSpec],
        turn: u64,
    ) -> Result<AgentId, TeamError> {
        if roster.is_empty() {
            return Err(TeamError::EmptyRoster);
        }
        let index = (turn % roster.len() as u64) as usize;
        Ok(roster[index].id.clone())
    }
}

/// A roster member is asked to pick the next speaker.
///
/// The orchestrator consults the same backend it converses with, but its
/// selection replies never enter the transcript.
pub struct Delegated {
    orchestrator: AgentId,
    provider: Arc<dyn Provider>,
    model: String,
}

impl Delegated {
    pub fn new(
        orchestrator: impl Into<AgentId>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator: orchestrator.into(),
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Selector for Delegated {
    async fn next_speaker(
        &mut self,
        transcript: &Transcript,
        roster: &[AgentSpec],
        _turn: u64,
    ) -> Result<AgentId, TeamError> {
        let reply = ask_for_speaker(
            self.provider.as_ref(),
            &self.model,
            transcript,
            roster,
            Some(&self.orchestrator),
        )
        .await?;
        match_roster(&reply, roster)
    }

    fn validate(&self, roster: &[AgentSpec]) -> Result<(), TeamError> {
        if roster.iter().any(|spec| spec.id == self.orchestrator) {
            Ok(())
        } else {
            Err(TeamError::UnknownOrchestrator(
                self.orchestrator.to_string(),
            ))
        }
    }
}

/// A dedicated model call (outside the roster) picks the next speaker.
pub struct ModelDriven {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ModelDriven {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Selector for ModelDriven {
    async fn next_speaker(
        &mut self,
        transcript: &Transcript,
        roster: &[AgentSpec],
        _turn: u64,
    ) -> Result<AgentId, TeamError> {
        let reply =
            ask_for_speaker(self.provider.as_ref(), &self.model, transcript, roster, None)
                .await?;
        match_roster(&reply, roster)
    }
}

/// Run one non-streaming selection call and return the raw reply text.
async fn ask_for_speaker(
    provider: &dyn Provider,
    model: &str,
    transcript: &Transcript,
    roster: &[AgentSpec],
    orchestrator: Option<&AgentId>,
) -> Result<String, TeamError> {
    let names: Vec<&str> = roster.iter().map(|spec| spec.id.as_str()).collect();
    let mut system = String::from(
        "You moderate a multi-agent conversation. Reply with exactly one \
         participant name and nothing else.\nParticipants:\n",
    );
    for spec in roster {
        system.push_str(&format!("- {}: {}\n", spec.id, spec.role_directive));
    }
    if let Some(who) = orchestrator {
        system.push_str(&format!("You are {who}.\n"));
    }

    let mut messages = vec![ChatMessage::system(system)];
    for msg in transcript.messages() {
        messages.push(ChatMessage::user(format!(
            "{}: {}",
            msg.speaker, msg.content
        )));
    }
    messages.push(ChatMessage::user(format!(
        "Who should speak next? Answer with one of: {}",
        names.join(", ")
    )));

    let response = provider
        .complete(ProviderRequest {
            model: model.to_string(),
            messages,
            temperature: 0.0,
            max_tokens: Some(32),
            tools: vec![],
        })
        .await
        .map_err(|e| TeamError::InvalidSelection {
            chosen: format!("<selection call failed: {e}>"),
        })?;

    debug!(reply = %response.content, "Selection model replied");
    Ok(response.content)
}

/// Map a selection reply onto a roster member.
///
/// Exact (trimmed) match wins; otherwise the roster name occurring earliest
/// in the reply is taken, so "Next up: reviewer." still resolves.
fn match_roster(reply: &str, roster: &[AgentSpec]) -> Result<AgentId, TeamError> {
    let trimmed = reply.trim();
    if let Some(spec) = roster.iter().find(|spec| spec.id.as_str() == trimmed) {
        return Ok(spec.id.clone());
    }

    roster
        .iter()
        .filter_map(|spec| reply.find(spec.id.as_str()).map(|at| (at, &spec.id)))
        .min_by_key(|(at, _)| *at)
        .map(|(_, id)| id.clone())
        .ok_or_else(|| TeamError::InvalidSelection {
            chosen: trimmed.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;

    fn roster(names: &[&str]) -> Vec<AgentSpec> {
        names
            .iter()
            .map(|n| AgentSpec::new(*n, format!("You are {n}.")))
            .collect()
    }

    #[tokio::test]
    async fn fixed_order_cycles_periodically() {
        let roster = roster(&["a", "b", "c"]);
        let transcript = Transcript::new();
        let mut selector = FixedOrder;

        let mut picks = Vec::new();
        for turn in 0..7 {
            picks.push(
                selector
                    .next_speaker(&transcript, &roster, turn)
                    .await
                    .unwrap()
                    .to_string(),
            );
        }
        assert_eq!(picks, vec!["a", "b", "c", "a", "b", "c", "a"]);
    }

    #[tokio::test]
    async fn fixed_order_rejects_empty_roster() {
        let mut selector = FixedOrder;
        let result = selector.next_speaker(&Transcript::new(), &[], 0).await;
        assert!(matches!(result, Err(TeamError::EmptyRoster)));
    }

    #[test]
    fn delegated_validates_orchestrator_membership() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let roster = roster(&["a", "b"]);

        let inside = Delegated::new("a", provider.clone(), "m");
        assert!(inside.validate(&roster).is_ok());

        let outside = Delegated::new("ghost", provider, "m");
        assert!(matches!(
            outside.validate(&roster),
            Err(TeamError::UnknownOrchestrator(name)) if name == "ghost"
        ));
    }

    #[tokio::test]
    async fn delegated_orchestrator_picks_next_speaker() {
        let provider = Arc::new(ScriptedProvider::text(&["reviewer"]));
        let mut selector = Delegated::new("generator", provider, "m");
        let roster = roster(&["generator", "reviewer"]);
        assert!(selector.validate(&roster).is_ok());

        let mut transcript = Transcript::new();
        transcript.append(colloquy_core::transcript::Message::text(
            "generator",
            "Here is a draft",
        ));

        let picked = selector
            .next_speaker(&transcript, &roster, 1)
            .await
            .unwrap();
        assert_eq!(picked.as_str(), "reviewer");
    }

    #[tokio::test]
    async fn delegated_non_roster_pick_is_invalid_selection() {
        let provider = Arc::new(ScriptedProvider::text(&["the audience"]));
        let mut selector = Delegated::new("generator", provider, "m");
        let roster = roster(&["generator", "reviewer"]);

        let result = selector.next_speaker(&Transcript::new(), &roster, 0).await;
        assert!(matches!(
            result,
            Err(TeamError::InvalidSelection { chosen }) if chosen == "the audience"
        ));
    }

    #[tokio::test]
    async fn model_driven_matches_exact_reply() {
        let provider = Arc::new(ScriptedProvider::text(&["reviewer"]));
        let mut selector = ModelDriven::new(provider, "m");
        let roster = roster(&["generator", "reviewer"]);

        let picked = selector
            .next_speaker(&Transcript::new(), &roster, 0)
            .await
            .unwrap();
        assert_eq!(picked.as_str(), "reviewer");
    }

    #[tokio::test]
    async fn model_driven_matches_name_inside_chatter() {
        let provider = Arc::new(ScriptedProvider::text(&["Next up: generator, I think."]));
        let mut selector = ModelDriven::new(provider, "m");
        let roster = roster(&["generator", "reviewer"]);

        let picked = selector
            .next_speaker(&Transcript::new(), &roster, 0)
            .await
            .unwrap();
        assert_eq!(picked.as_str(), "generator");
    }

    #[tokio::test]
    async fn unmatched_reply_is_invalid_selection() {
        let provider = Arc::new(ScriptedProvider::text(&["the narrator"]));
        let mut selector = ModelDriven::new(provider, "m");
        let roster = roster(&["generator", "reviewer"]);

        let result = selector.next_speaker(&Transcript::new(), &roster, 0).await;
        assert!(matches!(
            result,
            Err(TeamError::InvalidSelection { chosen }) if chosen == "the narrator"
        ));
    }
}
