//! Team event system — decoupled observation of a run.
//!
//! Events are published as the coordinator works through turns. Observers
//! (metrics, UIs, tests) subscribe without being wired into the loop.

use crate::transcript::{AgentId, MessageKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All events emitted during a team run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TeamEvent {
    /// A turn started for the selected speaker.
    TurnStarted {
        turn: u32,
        speaker: AgentId,
        timestamp: DateTime<Utc>,
    },

    /// A finalized message was appended to the transcript.
    MessageAppended {
        speaker: AgentId,
        kind: MessageKind,
        sequence: u64,
        chars: usize,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed.
    ToolExecuted {
        tool_name: String,
        requesting_agent: AgentId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The run reached a terminal state.
    RunHalted {
        reason: String,
        turns_taken: u32,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for team events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<TeamEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: TeamEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TeamEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
