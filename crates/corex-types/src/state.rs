use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level state of an agent run, partitioned into entry, core-loop,
/// control and terminal groups. See corex-runtime's state machine for the
/// transition table this enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    // Entry
    Init,
    ParsingIntent,
    // Core loop
    Planning,
    Reasoning,
    ToolCalling,
    Observing,
    // Control
    WaitingConfirm,
    Reflecting,
    Replanning,
    // Terminal
    Success,
    Failed,
    Cancelled,
    Timeout,
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentState::Success | AgentState::Failed | AgentState::Cancelled | AgentState::Timeout
        )
    }

    pub fn all() -> &'static [AgentState] {
        use AgentState::*;
        &[
            Init, ParsingIntent, Planning, Reasoning, ToolCalling, Observing, WaitingConfirm,
            Reflecting, Replanning, Success, Failed, Cancelled, Timeout,
        ]
    }
}

/// Causes of state transitions. Grouped by origin in the spec; represented
/// flatly here since the transition table keys on (state, signal) pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    // User-originated
    UserMessage,
    UserConfirm,
    UserReject,
    UserCancelled,
    // Intent classification
    IntentClear,
    IntentUnclear,
    SkillMatch,
    // Planning outcomes
    PlanCreated,
    PlanFailed,
    // Reasoning outcomes
    NeedTool,
    NeedConfirm,
    TaskComplete,
    ResponseReady,
    TaskFailed,
    // Exit-code signals from the structured tool-result convention
    ExitSuccess,
    ExitFailure,
    ExitNeedsUser,
    // Tool outcomes
    ToolSuccess,
    ToolFailed,
    // Observation control
    Continue,
    // Reflection outcomes
    CanRetry,
    MaxRetriesReached,
    NewPlanCreated,
    CannotReplan,
    // System signals
    MaxIterationsReached,
    TimeoutReached,
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Signal::UserMessage => "user_message",
            Signal::UserConfirm => "user_confirm",
            Signal::UserReject => "user_reject",
            Signal::UserCancelled => "user_cancelled",
            Signal::IntentClear => "intent_clear",
            Signal::IntentUnclear => "intent_unclear",
            Signal::SkillMatch => "skill_match",
            Signal::PlanCreated => "plan_created",
            Signal::PlanFailed => "plan_failed",
            Signal::NeedTool => "need_tool",
            Signal::NeedConfirm => "need_confirm",
            Signal::TaskComplete => "task_complete",
            Signal::ResponseReady => "response_ready",
            Signal::TaskFailed => "task_failed",
            Signal::ExitSuccess => "exit_success",
            Signal::ExitFailure => "exit_failure",
            Signal::ExitNeedsUser => "exit_needs_user",
            Signal::ToolSuccess => "tool_success",
            Signal::ToolFailed => "tool_failed",
            Signal::Continue => "continue",
            Signal::CanRetry => "can_retry",
            Signal::MaxRetriesReached => "max_retries_reached",
            Signal::NewPlanCreated => "new_plan_created",
            Signal::CannotReplan => "cannot_replan",
            Signal::MaxIterationsReached => "max_iterations_reached",
            Signal::TimeoutReached => "timeout_reached",
        }
    }
}

/// One entry in a Session's append-only State History.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: AgentState,
    pub signal: Option<Signal>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Value,
}

/// Append-only sequence of State Records for a Session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateHistory {
    records: Vec<StateRecord>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: StateRecord) {
        self.records.push(record);
    }

    pub fn current(&self) -> Option<&StateRecord> {
        self.records.last()
    }

    pub fn previous(&self) -> Option<&StateRecord> {
        self.records.iter().rev().nth(1)
    }

    pub fn path(&self) -> Vec<AgentState> {
        self.records.iter().map(|r| r.state).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
