use crate::ids::{CallId, RequestId, SessionId};
use crate::plan::Plan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal status carried by the final `done` event of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Incomplete,
    Cancelled,
    Timeout,
    Failed,
}

/// Result of a single tool invocation, as reported back into an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success,
    Error,
}

/// Type-specific payload. Serializes flat alongside the common fields via
/// `#[serde(flatten)]` on `Event::data`, matching the wire shape in `§6.1`
/// (a `type` tag plus a `data` object carrying common and per-type fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Status { message: String },
    Thinking { text: String },
    Content { text: String },
    ToolCall { tool_name: String, parameters: Value, call_id: CallId },
    ToolResult {
        tool_name: String,
        status: ToolOutcome,
        result: Option<Value>,
        error: Option<String>,
        call_id: CallId,
    },
    PlanCreated { plan: Plan },
    PlanRevised { plan: Plan },
    TaskStart { task_id: String, title: String, status: String },
    TaskComplete { task_id: String, title: String, status: String },
    TaskFailed { task_id: String, title: String, status: String },
    ProgressUpdate { completed: usize, total: usize },
    ReasoningDecision { action: String, reason: String },
    ConfirmRequired {
        request_id: RequestId,
        operation: String,
        description: String,
        context: Value,
    },
    Error { kind: String, message: String },
    Done { status: RunOutcome, progress: Value },
    Ping,
}

/// One frame of the client-facing run stream (`§6.1`). Common fields sit
/// alongside the type-specific payload; the reference encoding is a typed
/// header line followed by a JSON data line, newline-delimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub iteration: u64,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(session_id: SessionId, iteration: u64, payload: EventPayload) -> Self {
        Self {
            session_id,
            timestamp: Utc::now(),
            iteration,
            payload,
        }
    }

    /// The stable `type` discriminant string, e.g. `"tool_call"`.
    pub fn type_tag(&self) -> &'static str {
        match &self.payload {
            EventPayload::Status { .. } => "status",
            EventPayload::Thinking { .. } => "thinking",
            EventPayload::Content { .. } => "content",
            EventPayload::ToolCall { .. } => "tool_call",
            EventPayload::ToolResult { .. } => "tool_result",
            EventPayload::PlanCreated { .. } => "plan_created",
            EventPayload::PlanRevised { .. } => "plan_revised",
            EventPayload::TaskStart { .. } => "task_start",
            EventPayload::TaskComplete { .. } => "task_complete",
            EventPayload::TaskFailed { .. } => "task_failed",
            EventPayload::ProgressUpdate { .. } => "progress_update",
            EventPayload::ReasoningDecision { .. } => "reasoning_decision",
            EventPayload::ConfirmRequired { .. } => "confirm_required",
            EventPayload::Error { .. } => "error",
            EventPayload::Done { .. } => "done",
            EventPayload::Ping => "ping",
        }
    }

    /// Reference newline-delimited encoding: a typed header line, a JSON
    /// data line, and a trailing blank line.
    pub fn encode_ndjson(&self) -> serde_json::Result<String> {
        let data = serde_json::to_string(self)?;
        Ok(format!("event: {}\ndata: {}\n\n", self.type_tag(), data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tag_matches_serialized_discriminant() {
        let event = Event::new(SessionId::generate(), 0, EventPayload::Ping);
        assert_eq!(event.type_tag(), "ping");
        let encoded = event.encode_ndjson().unwrap();
        assert!(encoded.starts_with("event: ping\n"));
    }
}
