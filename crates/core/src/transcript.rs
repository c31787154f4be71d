//! Message and Transcript domain types.
//!
//! These are the core value objects of a run: agents produce Messages, the
//! team appends them to the shared Transcript, and every other component
//! (termination detection, tool dispatch, display) reads from it. Message
//! order is the sole source of truth for "what has been said".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a conversational participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What kind of content a message carries.
///
/// `ToolCall` is a first-class variant: agents emit a typed tool request
/// rather than free text that has to be re-parsed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain conversational text.
    Text,
    /// A serialized typed tool request (see `tool::ToolRequest`).
    ToolCall,
    /// The outcome of a tool invocation.
    ToolResult,
    /// A failure surfaced into the conversation instead of raised.
    Error,
}

/// A single message in the shared transcript.
///
/// Immutable once appended. `sequence` is assigned by the transcript on
/// append and increases monotonically within one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID.
    pub id: String,

    /// Who produced this message.
    pub speaker: AgentId,

    /// What kind of content it carries.
    pub kind: MessageKind,

    /// The text content.
    pub content: String,

    /// Position in the transcript, assigned on append.
    pub sequence: u64,

    /// Timestamp.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(speaker: AgentId, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            speaker,
            kind,
            content: content.into(),
            sequence: 0,
            timestamp: Utc::now(),
        }
    }

    /// Create a plain text message.
    pub fn text(speaker: impl Into<AgentId>, content: impl Into<String>) -> Self {
        Self::new(speaker.into(), MessageKind::Text, content)
    }

    /// Create a message carrying a serialized tool request.
    pub fn tool_call(speaker: impl Into<AgentId>, request_json: impl Into<String>) -> Self {
        Self::new(speaker.into(), MessageKind::ToolCall, request_json)
    }

    /// Create a message carrying a tool outcome.
    pub fn tool_result(speaker: impl Into<AgentId>, content: impl Into<String>) -> Self {
        Self::new(speaker.into(), MessageKind::ToolResult, content)
    }

    /// Create an error message.
    pub fn error(speaker: impl Into<AgentId>, content: impl Into<String>) -> Self {
        Self::new(speaker.into(), MessageKind::Error, content)
    }
}

/// The append-only ordered conversation log, shared by reference across all
/// agents for the lifetime of one run.
///
/// Only the team coordinator holds a mutable handle; agents submit content
/// and read history, they never append directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
    next_sequence: u64,
}

impl Transcript {
    /// Create a new empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, assigning it the next sequence number.
    ///
    /// Returns a reference to the message as stored.
    pub fn append(&mut self, mut message: Message) -> &Message {
        message.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.messages.push(message);
        self.messages.last().expect("just pushed")
    }

    /// The most recently appended message, if any.
    pub fn latest(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// All messages in append order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop all history and restart sequence numbering.
    ///
    /// Only the coordinator's reset path calls this; mid-run messages are
    /// never removed.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.next_sequence = 0;
    }
}
