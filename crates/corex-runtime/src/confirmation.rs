use crate::executor::ConfirmationGate;
use crate::state_machine::StateMachine;
use async_trait::async_trait;
use corex_types::{Error, Event, EventPayload, RequestId, SessionId, Signal, ToolCall};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};

/// Tracks outstanding HITL confirmation requests by `request_id`. A second
/// `resolve` delivery for a request that's already settled (or timed out
/// and been removed) is a no-op, giving the protocol its idempotent
/// delivery guarantee.
#[derive(Default)]
pub struct ConfirmationRegistry {
    pending: Mutex<HashMap<RequestId, oneshot::Sender<bool>>>,
}

impl ConfirmationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn wait_for(&self, request_id: RequestId, timeout: Duration) -> corex_types::Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.clone(), tx);

        let outcome = tokio::time::timeout(timeout, rx).await;
        self.pending.lock().await.remove(&request_id);

        match outcome {
            Ok(Ok(approved)) => Ok(approved),
            Ok(Err(_)) => Err(Error::ConfirmationDenied),
            Err(_) => Err(Error::ConfirmationTimeout),
        }
    }

    /// Resolve a pending confirmation. Ignored if `request_id` is unknown
    /// (already resolved, timed out, or never issued).
    pub async fn resolve(&self, request_id: &RequestId, approved: bool) {
        if let Some(tx) = self.pending.lock().await.remove(request_id) {
            let _ = tx.send(approved);
        }
    }
}

/// The executor-facing [`ConfirmationGate`] the orchestrator wires in:
/// emits `confirm_required`, drives the run's state machine into
/// `waiting_confirm` (§4.4), then blocks on the registry until a caller
/// resolves the request or the deadline elapses.
pub struct OrchestratorConfirmationGate {
    registry: Arc<ConfirmationRegistry>,
    events: mpsc::Sender<Event>,
    session_id: SessionId,
    iteration: Arc<AtomicU64>,
    timeout: Duration,
    state: Arc<Mutex<StateMachine>>,
}

impl OrchestratorConfirmationGate {
    pub fn new(
        registry: Arc<ConfirmationRegistry>,
        events: mpsc::Sender<Event>,
        session_id: SessionId,
        iteration: Arc<AtomicU64>,
        timeout: Duration,
        state: Arc<Mutex<StateMachine>>,
    ) -> Self {
        Self { registry, events, session_id, iteration, timeout, state }
    }
}

#[async_trait]
impl ConfirmationGate for OrchestratorConfirmationGate {
    async fn confirm(&self, request_id: &RequestId, call: &ToolCall) -> corex_types::Result<bool> {
        self.state.lock().await.apply(Signal::NeedConfirm).ok();

        let event = Event::new(
            self.session_id.clone(),
            self.iteration.load(Ordering::Relaxed),
            EventPayload::ConfirmRequired {
                request_id: request_id.clone(),
                operation: call.tool_name.clone(),
                description: format!("approve invocation of '{}'", call.tool_name),
                context: call.parameters.clone(),
            },
        );
        let _ = self.events.send(event).await;
        let outcome = self.registry.wait_for(request_id.clone(), self.timeout).await;

        let mut state = self.state.lock().await;
        match &outcome {
            Ok(true) => {
                state.apply(Signal::UserConfirm).ok();
            }
            Ok(false) => {
                state.apply(Signal::UserReject).ok();
            }
            Err(Error::ConfirmationTimeout) => {
                state.apply(Signal::TimeoutReached).ok();
            }
            Err(_) => {
                state.apply(Signal::UserReject).ok();
            }
        }
        drop(state);

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_before_timeout_delivers_the_approval() {
        let registry = Arc::new(ConfirmationRegistry::new());
        let request_id = RequestId::generate();

        let wait = {
            let registry = Arc::clone(&registry);
            let request_id = request_id.clone();
            tokio::spawn(async move { registry.wait_for(request_id, Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        registry.resolve(&request_id, true).await;

        assert_eq!(wait.await.unwrap().unwrap(), true);
    }

    #[tokio::test]
    async fn a_second_resolve_for_an_already_settled_request_is_ignored() {
        let registry = Arc::new(ConfirmationRegistry::new());
        let request_id = RequestId::generate();
        registry.resolve(&request_id, true).await; // nothing pending yet; no-op, doesn't panic
    }

    #[tokio::test]
    async fn an_unresolved_request_times_out() {
        let registry = Arc::new(ConfirmationRegistry::new());
        let request_id = RequestId::generate();
        let result = registry.wait_for(request_id, Duration::from_millis(5)).await;
        assert!(matches!(result, Err(Error::ConfirmationTimeout)));
    }

    fn reasoning_state() -> Arc<Mutex<StateMachine>> {
        let mut m = StateMachine::new();
        m.apply(corex_types::Signal::UserMessage).unwrap();
        m.apply(corex_types::Signal::IntentClear).unwrap();
        m.apply(corex_types::Signal::PlanCreated).unwrap();
        Arc::new(Mutex::new(m))
    }

    #[tokio::test]
    async fn an_approved_confirmation_drives_the_state_machine_to_tool_calling() {
        let state = reasoning_state();
        let registry = Arc::new(ConfirmationRegistry::new());
        let (events, _rx) = mpsc::channel(8);
        let gate = OrchestratorConfirmationGate::new(
            Arc::clone(&registry),
            events,
            SessionId::generate(),
            Arc::new(AtomicU64::new(0)),
            Duration::from_secs(5),
            Arc::clone(&state),
        );

        let call = ToolCall { call_id: corex_types::CallId::generate(), tool_name: "delete_file".into(), parameters: serde_json::Value::Null };
        let request_id = RequestId::generate();
        let confirming = {
            let registry = Arc::clone(&registry);
            let request_id = request_id.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                registry.resolve(&request_id, true).await;
            })
        };

        let approved = gate.confirm(&request_id, &call).await.unwrap();
        confirming.await.unwrap();

        assert!(approved);
        assert_eq!(state.lock().await.current(), corex_types::AgentState::ToolCalling);
    }

    #[tokio::test]
    async fn a_timed_out_confirmation_drives_the_state_machine_to_timeout() {
        let state = reasoning_state();
        let registry = Arc::new(ConfirmationRegistry::new());
        let (events, _rx) = mpsc::channel(8);
        let gate = OrchestratorConfirmationGate::new(
            registry,
            events,
            SessionId::generate(),
            Arc::new(AtomicU64::new(0)),
            Duration::from_millis(5),
            Arc::clone(&state),
        );

        let call = ToolCall { call_id: corex_types::CallId::generate(), tool_name: "delete_file".into(), parameters: serde_json::Value::Null };
        let request_id = RequestId::generate();
        let result = gate.confirm(&request_id, &call).await;

        assert!(matches!(result, Err(Error::ConfirmationTimeout)));
        assert_eq!(state.lock().await.current(), corex_types::AgentState::Timeout);
    }
}
