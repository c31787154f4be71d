//! Termination detection — when is the conversation finished?
//!
//! The detector is a pure check against the latest finalized message only;
//! earlier messages are never re-evaluated and there is no look-ahead.

use colloquy_core::transcript::{AgentId, Message};
use std::sync::Arc;

/// What fires the condition.
#[derive(Clone)]
pub enum Trigger {
    /// Exact, case-sensitive substring match anywhere in the content.
    ///
    /// This cannot distinguish the marker from an accidental quotation of
    /// it; that ambiguity is accepted.
    Substring(String),

    /// Arbitrary predicate over the message.
    Predicate(Arc<dyn Fn(&Message) -> bool + Send + Sync>),
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Substring(s) => f.debug_tuple("Substring").field(s).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Which speakers the condition applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    AnySpeaker,
    Speaker(AgentId),
}

/// The rule that ends a run successfully.
#[derive(Debug, Clone)]
pub struct TerminationCondition {
    pub trigger: Trigger,
    pub scope: Scope,
}

impl TerminationCondition {
    /// Halt when any speaker mentions `marker`.
    pub fn mention(marker: impl Into<String>) -> Self {
        Self {
            trigger: Trigger::Substring(marker.into()),
            scope: Scope::AnySpeaker,
        }
    }

    /// Halt when `speaker` mentions `marker`; mentions by others are ignored.
    pub fn mention_by(marker: impl Into<String>, speaker: impl Into<AgentId>) -> Self {
        Self {
            trigger: Trigger::Substring(marker.into()),
            scope: Scope::Speaker(speaker.into()),
        }
    }

    /// Halt when the predicate holds for the latest message.
    pub fn predicate(f: impl Fn(&Message) -> bool + Send + Sync + 'static) -> Self {
        Self {
            trigger: Trigger::Predicate(Arc::new(f)),
            scope: Scope::AnySpeaker,
        }
    }

    /// Restrict this condition to one speaker.
    pub fn scoped_to(mut self, speaker: impl Into<AgentId>) -> Self {
        self.scope = Scope::Speaker(speaker.into());
        self
    }

    /// Does the latest finalized message satisfy the condition?
    pub fn matches(&self, latest: &Message) -> bool {
        if let Scope::Speaker(who) = &self.scope
            && latest.speaker != *who
        {
            return false;
        }

        match &self.trigger {
            Trigger::Substring(marker) => latest.content.contains(marker),
            Trigger::Predicate(f) => f(latest),
        }
    }
}
