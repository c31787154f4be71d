//! # colloquy Core
//!
//! Domain types, traits, and error definitions for the colloquy multi-agent
//! runtime. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping backends via configuration
//! - Easy testing with scripted mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod provider;
pub mod spec;
pub mod tool;
pub mod transcript;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, TeamError, ToolError};
pub use event::{EventBus, TeamEvent};
pub use provider::{
    ChatMessage, ChatRole, Provider, ProviderRequest, ProviderResponse, ProviderToolCall,
    StreamChunk, ToolDefinition, Usage,
};
pub use spec::{AgentSpec, Capabilities};
pub use tool::{Tool, ToolOutcome, ToolRegistry, ToolRequest, ToolStatus};
pub use transcript::{AgentId, Message, MessageKind, Transcript};
