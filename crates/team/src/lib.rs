//! Turn coordination for colloquy.
//!
//! This crate drives a roster of agents through a shared transcript: a
//! selection strategy picks the speaker, the aggregator reassembles the
//! backend's delta stream into one finalized message, the dispatcher
//! executes tool requests, and the termination condition decides when the
//! conversation is finished.

pub mod agent;
pub mod aggregator;
pub mod dispatch;
pub mod select;
pub mod team;
pub mod termination;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use agent::Agent;
pub use aggregator::{aggregate, Aggregated, DeltaSink, NullSink, StreamStats};
pub use dispatch::{ToolDispatcher, TOOL_SPEAKER};
pub use select::{Delegated, FixedOrder, ModelDriven, Selector};
pub use team::{RunReport, RunState, Team, TurnBudget, DEFAULT_MAX_TURNS, USER_SPEAKER};
pub use termination::{Scope, TerminationCondition, Trigger};
