use chrono::Utc;
use corex_types::{AgentState, Error, Signal, StateHistory, StateRecord};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};

use AgentState::*;
use Signal::*;

/// The statically declared (state, signal) -> state table. Order mirrors
/// the transition semantics: entry, core loop, control, in that order.
const TRANSITIONS: &[(AgentState, Signal, AgentState)] = &[
    (Init, UserMessage, ParsingIntent),
    (ParsingIntent, IntentClear, Planning),
    (ParsingIntent, SkillMatch, Planning),
    (ParsingIntent, IntentUnclear, Reasoning),
    (Planning, PlanCreated, Reasoning),
    (Planning, PlanFailed, Reflecting),
    (Reasoning, NeedTool, ToolCalling),
    (Reasoning, NeedConfirm, WaitingConfirm),
    (Reasoning, TaskComplete, Success),
    (Reasoning, ResponseReady, Success),
    (Reasoning, ExitSuccess, Success),
    (Reasoning, TaskFailed, Reflecting),
    (Reasoning, ExitFailure, Reflecting),
    (Reasoning, MaxIterationsReached, Timeout),
    (ToolCalling, ToolSuccess, Observing),
    (ToolCalling, ToolFailed, Observing),
    (ToolCalling, NeedConfirm, WaitingConfirm),
    (Observing, Continue, Reasoning),
    (Observing, ExitSuccess, Success),
    (Observing, ExitFailure, Reflecting),
    (Observing, ExitNeedsUser, WaitingConfirm),
    (WaitingConfirm, UserConfirm, ToolCalling),
    (WaitingConfirm, UserReject, Reasoning),
    (WaitingConfirm, UserCancelled, Cancelled),
    (WaitingConfirm, TimeoutReached, Timeout),
    (Reflecting, CanRetry, Replanning),
    (Reflecting, MaxRetriesReached, Failed),
    (Replanning, NewPlanCreated, Reasoning),
    (Replanning, CannotReplan, Failed),
];

/// Owns the current state and history for one run, enforcing the
/// statically declared transition table. The table itself is validated
/// once at construction rather than on every `apply` call.
pub struct StateMachine {
    current: AgentState,
    table: HashMap<(AgentState, Signal), AgentState>,
    history: StateHistory,
}

impl StateMachine {
    /// Build a fresh machine at `init`, validating the transition table.
    /// Validation failures are fatal configuration errors, matching the
    /// contract in the component design.
    pub fn new() -> Self {
        let table = build_table();
        validate_table(&table).expect("transition table failed startup validation");
        let mut history = StateHistory::new();
        history.push(StateRecord { state: Init, signal: None, timestamp: Utc::now(), metadata: Value::Null });
        Self { current: Init, table, history }
    }

    /// Resume a machine already in `state`, as a warm start from a
    /// checkpoint. The table is still validated; history starts fresh
    /// from the restored state rather than replaying the original run.
    pub fn resume_at(state: AgentState) -> Self {
        let table = build_table();
        validate_table(&table).expect("transition table failed startup validation");
        let mut history = StateHistory::new();
        history.push(StateRecord { state, signal: None, timestamp: Utc::now(), metadata: Value::Null });
        Self { current: state, table, history }
    }

    pub fn current(&self) -> AgentState {
        self.current
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// Apply `signal` from the current state. On success the machine
    /// transitions, records a `StateRecord`, and returns the new state. On
    /// failure the machine is left unchanged and an `invalid_transition`
    /// error is returned.
    pub fn apply(&mut self, signal: Signal) -> corex_types::Result<AgentState> {
        self.apply_with_metadata(signal, Value::Null)
    }

    pub fn apply_with_metadata(&mut self, signal: Signal, metadata: Value) -> corex_types::Result<AgentState> {
        let next = *self.table.get(&(self.current, signal)).ok_or_else(|| Error::InvalidTransition {
            state: format!("{:?}", self.current).to_lowercase(),
            signal: signal.name().to_string(),
        })?;
        self.current = next;
        self.history.push(StateRecord { state: next, signal: Some(signal), timestamp: Utc::now(), metadata });
        Ok(next)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn build_table() -> HashMap<(AgentState, Signal), AgentState> {
    TRANSITIONS.iter().map(|&(from, signal, to)| ((from, signal), to)).collect()
}

/// Every non-terminal state has at least one outgoing transition, every
/// state is reachable from `init`, and terminal states have none.
fn validate_table(table: &HashMap<(AgentState, Signal), AgentState>) -> Result<(), String> {
    for state in AgentState::all() {
        let has_outgoing = table.keys().any(|(from, _)| from == state);
        if state.is_terminal() && has_outgoing {
            return Err(format!("terminal state {state:?} has an outgoing transition"));
        }
        if !state.is_terminal() && !has_outgoing {
            return Err(format!("non-terminal state {state:?} has no outgoing transition"));
        }
    }

    let mut reachable: HashSet<AgentState> = HashSet::new();
    let mut queue = VecDeque::from([Init]);
    reachable.insert(Init);
    while let Some(state) = queue.pop_front() {
        for (&(from, _), &to) in table.iter() {
            if from == state && reachable.insert(to) {
                queue.push_back(to);
            }
        }
    }
    for state in AgentState::all() {
        if !reachable.contains(state) {
            return Err(format!("state {state:?} is unreachable from init"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_table_passes_startup_validation() {
        validate_table(&build_table()).expect("table should be valid");
    }

    #[test]
    fn happy_path_reaches_success() {
        let mut m = StateMachine::new();
        assert_eq!(m.apply(UserMessage).unwrap(), ParsingIntent);
        assert_eq!(m.apply(IntentClear).unwrap(), Planning);
        assert_eq!(m.apply(PlanCreated).unwrap(), Reasoning);
        assert_eq!(m.apply(ExitSuccess).unwrap(), Success);
        assert!(m.is_terminal());
    }

    #[test]
    fn undeclared_signal_is_rejected_and_state_is_unchanged() {
        let mut m = StateMachine::new();
        let err = m.apply(ExitSuccess).unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
        assert_eq!(m.current(), Init);
    }

    #[test]
    fn reflect_retry_loop_returns_to_reasoning_via_replanning() {
        let mut m = StateMachine::new();
        m.apply(UserMessage).unwrap();
        m.apply(IntentClear).unwrap();
        m.apply(PlanCreated).unwrap();
        m.apply(TaskFailed).unwrap();
        assert_eq!(m.current(), Reflecting);
        assert_eq!(m.apply(CanRetry).unwrap(), Replanning);
        assert_eq!(m.apply(NewPlanCreated).unwrap(), Reasoning);
    }

    #[test]
    fn resume_at_restores_a_warm_start_state() {
        let m = StateMachine::resume_at(WaitingConfirm);
        assert_eq!(m.current(), WaitingConfirm);
        assert_eq!(m.history().len(), 1);
    }

    #[test]
    fn history_records_every_transition() {
        let mut m = StateMachine::new();
        m.apply(UserMessage).unwrap();
        m.apply(IntentClear).unwrap();
        assert_eq!(m.history().path(), vec![Init, ParsingIntent, Planning]);
    }
}
