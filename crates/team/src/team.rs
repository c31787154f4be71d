//! The turn coordinator.
//!
//! One loop drives everything: pick a speaker, stream their response into
//! the transcript, dispatch any tool request, check termination, repeat
//! until a condition matches or the turn budget runs out. Per-turn failures
//! are absorbed into the transcript as visible messages; the loop itself
//! only stops for termination, budget, or a selection outside the roster.

use crate::agent::Agent;
use crate::aggregator::{aggregate, DeltaSink};
use crate::dispatch::{request_from_provider_call, ToolDispatcher};
use crate::select::Selector;
use crate::termination::TerminationCondition;
use chrono::Utc;
use colloquy_core::error::TeamError;
use colloquy_core::event::{EventBus, TeamEvent};
use colloquy_core::spec::AgentSpec;
use colloquy_core::transcript::{Message, Transcript};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Speaker id of the initial task message.
pub const USER_SPEAKER: &str = "user";

/// Safety net, not a tuning knob.
pub const DEFAULT_MAX_TURNS: u32 = 2000;

/// Where a run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// The termination condition matched.
    HaltedOnCondition,
    /// The turn budget ran out before any condition matched.
    HaltedOnBudget,
    /// Selection failed; the run cannot continue meaningfully.
    HaltedOnError,
}

/// Counts turns against a hard ceiling.
///
/// `turns_taken` never exceeds `max_turns`; the loop checks before running
/// a turn, so exhaustion halts at exactly the budgeted turn count.
#[derive(Debug, Clone)]
pub struct TurnBudget {
    max_turns: u32,
    turns_taken: u32,
}

impl TurnBudget {
    pub fn new(max_turns: u32) -> Result<Self, TeamError> {
        if max_turns == 0 {
            return Err(TeamError::ZeroBudget);
        }
        Ok(Self {
            max_turns,
            turns_taken: 0,
        })
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn turns_taken(&self) -> u32 {
        self.turns_taken
    }

    fn exhausted(&self) -> bool {
        self.turns_taken >= self.max_turns
    }

    fn record_turn(&mut self) {
        self.turns_taken += 1;
    }

    fn reset(&mut self) {
        self.turns_taken = 0;
    }
}

impl Default for TurnBudget {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            turns_taken: 0,
        }
    }
}

/// How a finished run ended.
#[derive(Debug)]
pub struct RunReport {
    pub state: RunState,
    pub turns_taken: u32,
    pub halt_reason: String,
    /// Transcript length at halt, including the initial task message.
    pub messages: usize,
}

/// A roster of agents driven through turns against one shared transcript.
pub struct Team {
    roster: Vec<Agent>,
    specs: Vec<AgentSpec>,
    selector: Box<dyn Selector>,
    termination: TerminationCondition,
    budget: TurnBudget,
    transcript: Transcript,
    dispatcher: Option<ToolDispatcher>,
    events: Arc<EventBus>,
    state: RunState,
}

impl Team {
    /// Assemble a team, validating the roster and selector configuration.
    ///
    /// These are the only errors that abort before a turn runs.
    pub fn new(
        roster: Vec<Agent>,
        selector: Box<dyn Selector>,
        termination: TerminationCondition,
    ) -> Result<Self, TeamError> {
        if roster.is_empty() {
            return Err(TeamError::EmptyRoster);
        }

        let mut seen = HashSet::new();
        for agent in &roster {
            if !seen.insert(agent.id().clone()) {
                return Err(TeamError::DuplicateAgent(agent.id().to_string()));
            }
        }

        let specs: Vec<AgentSpec> = roster.iter().map(|a| a.spec().clone()).collect();
        selector.validate(&specs)?;

        Ok(Self {
            roster,
            specs,
            selector,
            termination,
            budget: TurnBudget::default(),
            transcript: Transcript::new(),
            dispatcher: None,
            events: Arc::new(EventBus::default()),
            state: RunState::Running,
        })
    }

    /// Attach a tool dispatcher; without one, tool requests go undispatched.
    pub fn with_dispatcher(mut self, dispatcher: ToolDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Override the default turn budget.
    pub fn with_max_turns(mut self, max_turns: u32) -> Result<Self, TeamError> {
        self.budget = TurnBudget::new(max_turns)?;
        Ok(self)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// Clear all run state so the same team can take a fresh task.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.budget.reset();
        self.selector.reset();
        self.state = RunState::Running;
    }

    /// Drive the conversation on `task` until it halts.
    ///
    /// The task enters the transcript as a user message, then turns run
    /// until the termination condition matches, the budget is exhausted, or
    /// selection fails. An in-flight stream always finishes before a halt
    /// takes effect.
    pub async fn run(&mut self, task: impl Into<String>, sink: &mut dyn DeltaSink) -> RunReport {
        self.state = RunState::Running;
        let task = task.into();
        info!(agents = self.roster.len(), max_turns = self.budget.max_turns(), "Run starting");

        self.append(Message::text(USER_SPEAKER, task));

        let halt_reason = loop {
            if self.budget.exhausted() {
                self.state = RunState::HaltedOnBudget;
                break format!("turn budget of {} exhausted", self.budget.max_turns());
            }

            let turn = self.budget.turns_taken();
            let speaker = match self
                .selector
                .next_speaker(&self.transcript, &self.specs, turn as u64)
                .await
            {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "Selection failed, halting");
                    self.state = RunState::HaltedOnError;
                    break e.to_string();
                }
            };

            // Selectors guarantee membership; a miss here is a selector bug.
            let Some(agent) = self.roster.iter().find(|a| *a.id() == speaker) else {
                self.state = RunState::HaltedOnError;
                break TeamError::InvalidSelection {
                    chosen: speaker.to_string(),
                }
                .to_string();
            };
            let spec = agent.spec().clone();

            self.events.publish(TeamEvent::TurnStarted {
                turn,
                speaker: speaker.clone(),
                timestamp: Utc::now(),
            });
            self.budget.record_turn();

            let mut appended = Vec::new();
            match agent.respond(&self.transcript).await {
                Ok(rx) => {
                    let result = aggregate(&speaker, rx, sink).await;

                    if let Some(stream_error) = result.error {
                        // Partial output stays visible next to the failure.
                        let body = if result.content.is_empty() {
                            stream_error.to_string()
                        } else {
                            format!("{}\n[stream interrupted: {stream_error}]", result.content)
                        };
                        appended.push(self.append(Message::error(speaker.clone(), body)));
                    } else {
                        if !result.content.trim().is_empty() {
                            appended.push(
                                self.append(Message::text(speaker.clone(), result.content)),
                            );
                        }
                        for call in &result.tool_calls {
                            match request_from_provider_call(&speaker, call) {
                                Ok(request) => match serde_json::to_string(&request) {
                                    Ok(json) => appended.push(
                                        self.append(Message::tool_call(speaker.clone(), json)),
                                    ),
                                    Err(e) => appended.push(
                                        self.append(Message::error(speaker.clone(), e.to_string())),
                                    ),
                                },
                                Err(explanation) => appended.push(
                                    self.append(Message::error(speaker.clone(), explanation)),
                                ),
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(speaker = %speaker, error = %e, "Backend call failed, absorbing");
                    appended.push(self.append(Message::error(speaker.clone(), e.to_string())));
                }
            }

            let mut terminated = false;
            for message in appended {
                if let Some(dispatched) = self.dispatch_for(&spec, &message).await {
                    terminated = terminated || self.termination.matches(&dispatched);
                }
                terminated = terminated || self.termination.matches(&message);
            }

            if terminated {
                self.state = RunState::HaltedOnCondition;
                break "termination condition matched".to_string();
            }
        };

        let report = RunReport {
            state: self.state,
            turns_taken: self.budget.turns_taken(),
            halt_reason: halt_reason.clone(),
            messages: self.transcript.len(),
        };

        info!(
            state = ?report.state,
            turns = report.turns_taken,
            reason = %halt_reason,
            "Run halted"
        );
        self.events.publish(TeamEvent::RunHalted {
            reason: halt_reason,
            turns_taken: report.turns_taken,
            timestamp: Utc::now(),
        });

        report
    }

    /// Append a finalized message and publish its event.
    fn append(&mut self, message: Message) -> Message {
        let stored = self.transcript.append(message).clone();
        self.events.publish(TeamEvent::MessageAppended {
            speaker: stored.speaker.clone(),
            kind: stored.kind,
            sequence: stored.sequence,
            chars: stored.content.chars().count(),
            timestamp: Utc::now(),
        });
        stored
    }

    /// Run the dispatcher on one finalized message, appending the result.
    async fn dispatch_for(&mut self, spec: &AgentSpec, message: &Message) -> Option<Message> {
        let dispatcher = self.dispatcher.as_ref()?;
        let dispatched = dispatcher.dispatch(spec, message).await?;

        self.events.publish(TeamEvent::ToolExecuted {
            tool_name: dispatched.tool_name,
            requesting_agent: dispatched.requesting_agent,
            success: dispatched.success,
            duration_ms: dispatched.duration_ms,
            timestamp: Utc::now(),
        });

        Some(self.append(dispatched.message))
    }
}
