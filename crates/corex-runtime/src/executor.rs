use crate::events::EventEmitter;
use crate::state_machine::StateMachine;
use async_trait::async_trait;
use corex_providers::{ChatMessage, ChatRequest, ChatRole, ModelProvider, Tool as _, ToolContext, ToolRegistry};
use corex_types::{
    CallId, ContextMessage, Error, EventPayload, RequestId, Signal, Task, TokenCounter, ToolCall, ToolOutcome,
    ToolResult, ToolStatus,
};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const FINAL_ANSWER_MARKER: &str = "FINAL_ANSWER:";
const FINDING_MARKER: &str = "FINDING:";
const VERDICT_FAIL: &str = "VERDICT:FAIL";

/// Side channel for facts the orchestrator's behavioral rules (§4.6) need
/// but that don't belong in [`TaskOutcome`] itself: findings the model
/// recorded during the task, and how many information-acquisition tool
/// calls it made without recording one.
#[derive(Debug, Default, Clone)]
pub struct ExecutionNotes {
    pub findings: Vec<String>,
    pub info_actions: u32,
}

/// Asked by the executor before invoking a tool whose risk classification
/// requires user approval. The orchestrator implements this by emitting
/// `confirm_required`, transitioning the state machine to `waiting_confirm`,
/// and resolving once a correlated `confirm`/`reject` signal arrives or the
/// configured deadline elapses — all invisible to the executor, which only
/// sees the resulting boolean (or a timeout error).
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, request_id: &RequestId, call: &ToolCall) -> corex_types::Result<bool>;
}

/// A gate that approves everything immediately; used in tests and any
/// deployment that has no critical-risk tools registered.
pub struct AlwaysApprove;

#[async_trait]
impl ConfirmationGate for AlwaysApprove {
    async fn confirm(&self, _request_id: &RequestId, _call: &ToolCall) -> corex_types::Result<bool> {
        Ok(true)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_iterations_per_task: u32,
    pub max_tool_retries: u32,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Whether the task's acceptance criterion is checked with a second
    /// model turn before reporting success. Prompt-configurable per §4.4.
    pub verify_acceptance: bool,
    /// Per-call budget for a tool invocation and for a single streamed
    /// model turn (§5, §6.6 `tool_call_timeout_s`). An elapsed tool call is
    /// treated as a transient failure and retried under the same policy as
    /// a `ToolTransient` error.
    pub tool_call_timeout_s: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations_per_task: 10,
            max_tool_retries: 3,
            model: "executor".into(),
            max_tokens: 4096,
            temperature: 0.2,
            verify_acceptance: true,
            tool_call_timeout_s: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success { output: String },
    ValidatedFailure { reason: String },
    Timeout,
    Fatal(String),
}

/// Drives the LLM <-> tool loop for one task to a verifiable terminus.
pub struct TaskExecutor {
    provider: ModelProvider,
    tools: ToolRegistry,
    confirmation: Arc<dyn ConfirmationGate>,
    config: ExecutorConfig,
    state: Arc<Mutex<StateMachine>>,
}

impl TaskExecutor {
    pub fn new(
        provider: ModelProvider,
        tools: ToolRegistry,
        confirmation: Arc<dyn ConfirmationGate>,
        config: ExecutorConfig,
        state: Arc<Mutex<StateMachine>>,
    ) -> Self {
        Self { provider, tools, confirmation, config, state }
    }

    pub async fn execute(
        &self,
        task: &Task,
        recitation: &str,
        messages: &mut Vec<ContextMessage>,
        tokens: &mut TokenCounter,
        tool_ctx: &ToolContext,
        emitter: &mut EventEmitter,
    ) -> (TaskOutcome, ExecutionNotes) {
        messages.push(ContextMessage::UserTurn { text: task_prompt(task, recitation) });
        let mut notes = ExecutionNotes::default();

        for _ in 0..self.config.max_iterations_per_task {
            let text = match self.complete(messages).await {
                Ok((text, input, output)) => {
                    tokens.add(input, output);
                    text
                }
                Err(err) => return (TaskOutcome::Fatal(err.to_string()), notes),
            };

            notes.findings.extend(find_findings(&text));

            let calls = find_tool_calls(&text);
            let had_tool_calls = !calls.is_empty();
            if had_tool_calls {
                messages.push(ContextMessage::AssistantTurn { text: text.clone() });
                self.state.lock().await.apply(Signal::NeedTool).ok();
                let mut any_failed = false;
                for call in calls {
                    if self.tools.get(&call.tool_name).map(|t| t.is_info_acquisition()).unwrap_or(false) {
                        notes.info_actions += 1;
                    }
                    emitter
                        .emit(EventPayload::ToolCall {
                            tool_name: call.tool_name.clone(),
                            parameters: call.parameters.clone(),
                            call_id: call.call_id.clone(),
                        })
                        .await
                        .ok();
                    let result = self.invoke_with_retry(&call, tool_ctx).await;
                    any_failed = any_failed || result.status == ToolStatus::Error;
                    emitter
                        .emit(EventPayload::ToolResult {
                            tool_name: result.tool_name.clone(),
                            status: match result.status {
                                ToolStatus::Success => ToolOutcome::Success,
                                ToolStatus::Error => ToolOutcome::Error,
                            },
                            result: result.output.clone(),
                            error: result.error.clone(),
                            call_id: result.call_id.clone(),
                        })
                        .await
                        .ok();
                    messages.push(ContextMessage::ToolResult { tool_name: call.tool_name.clone(), body: result.to_block() });
                }
                let mut state = self.state.lock().await;
                state.apply(if any_failed { Signal::ToolFailed } else { Signal::ToolSuccess }).ok();
                state.apply(Signal::Continue).ok();
                drop(state);
            }

            if let Some(answer) = find_final_answer(&text) {
                if self.config.verify_acceptance {
                    match self.verify(task, &answer).await {
                        Ok(true) | Err(_) => return (TaskOutcome::Success { output: answer }, notes),
                        Ok(false) => {
                            return (TaskOutcome::ValidatedFailure { reason: "acceptance criterion not met".into() }, notes)
                        }
                    }
                }
                return (TaskOutcome::Success { output: answer }, notes);
            }

            if !had_tool_calls {
                messages.push(ContextMessage::AssistantTurn { text });
            }
        }

        (TaskOutcome::Timeout, notes)
    }

    async fn invoke_with_retry(&self, call: &ToolCall, tool_ctx: &ToolContext) -> ToolResult {
        let Some(tool) = self.tools.get(&call.tool_name) else {
            return ToolResult::error(call.call_id.clone(), call.tool_name.clone(), format!("unknown tool: {}", call.tool_name));
        };

        if tool.risk().requires_confirmation() {
            match self.confirmation.confirm(&RequestId::generate(), call).await {
                Ok(true) => {}
                Ok(false) => {
                    return ToolResult::error(call.call_id.clone(), call.tool_name.clone(), "confirmation denied");
                }
                Err(err) => {
                    return ToolResult::error(call.call_id.clone(), call.tool_name.clone(), err.to_string());
                }
            }
        }

        let timeout = Duration::from_secs(self.config.tool_call_timeout_s);
        let mut attempt = 0u32;
        loop {
            let outcome = tokio::time::timeout(timeout, tool.invoke(call.parameters.clone(), tool_ctx)).await;
            let result = match outcome {
                Ok(inner) => inner,
                Err(_) => Err(Error::SandboxTimeout),
            };
            match result {
                Ok(output) => return ToolResult::success(call.call_id.clone(), call.tool_name.clone(), output),
                Err(err) if err.is_transient() && attempt < self.config.max_tool_retries => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(200 * 2u64.pow(attempt))).await;
                }
                Err(err) => return ToolResult::error(call.call_id.clone(), call.tool_name.clone(), err.to_string()),
            }
        }
    }

    async fn complete(&self, messages: &[ContextMessage]) -> corex_types::Result<(String, u64, u64)> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            system: Some(EXECUTOR_SYSTEM_PROMPT.to_string()),
            messages: messages.iter().map(to_chat_message).collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        let timeout = Duration::from_secs(self.config.tool_call_timeout_s);
        let rx = self.provider.stream(request).await.map_err(|e| Error::Internal(e.to_string()))?;
        match tokio::time::timeout(timeout, corex_providers::client::collect(rx)).await {
            Ok(result) => result.map_err(|e| Error::Internal(e.to_string())),
            Err(_) => Err(Error::Internal("model turn timed out".into())),
        }
    }

    async fn verify(&self, task: &Task, answer: &str) -> corex_types::Result<bool> {
        let prompt = format!(
            "Acceptance criterion: {}\n\nProposed answer:\n{}\n\nRespond with \"{VERDICT_FAIL}\" if the \
             criterion is not met, otherwise respond with \"VERDICT:PASS\".",
            task.acceptance_criterion, answer
        );
        let request = ChatRequest {
            model: self.config.model.clone(),
            system: None,
            messages: vec![ChatMessage { role: ChatRole::User, content: prompt }],
            max_tokens: 64,
            temperature: 0.0,
        };
        let rx = self.provider.stream(request).await.map_err(|e| Error::Internal(e.to_string()))?;
        let (text, _, _) = corex_providers::client::collect(rx).await.map_err(|e| Error::Internal(e.to_string()))?;
        Ok(!text.contains(VERDICT_FAIL))
    }
}

const EXECUTOR_SYSTEM_PROMPT: &str = "You complete one atomic task at a time. Invoke tools with a fenced \
```tool_call\n{\"tool_name\": ..., \"parameters\": {...}}\n``` block. After every two information-gathering \
tool calls, record what you learned with a line starting with \"FINDING:\". When the task is complete, \
respond with a line starting with \"FINAL_ANSWER:\" followed by the result.";

fn task_prompt(task: &Task, recitation: &str) -> String {
    format!(
        "{recitation}\n\nTask: {}\nDescription: {}\nAcceptance criterion: {}\nSuggested tools: {}",
        task.title,
        task.description,
        task.acceptance_criterion,
        task.tool_hints.join(", ")
    )
}

fn to_chat_message(message: &ContextMessage) -> ChatMessage {
    match message {
        ContextMessage::UserTurn { text } => ChatMessage { role: ChatRole::User, content: text.clone() },
        ContextMessage::AssistantTurn { text } => ChatMessage { role: ChatRole::Assistant, content: text.clone() },
        ContextMessage::ToolResult { body, .. } => ChatMessage { role: ChatRole::User, content: body.clone() },
    }
}

fn find_tool_calls(text: &str) -> Vec<ToolCall> {
    let pattern = Regex::new(r"(?s)```tool_call\s*\n(.*?)\n```").expect("static regex");
    pattern
        .captures_iter(text)
        .filter_map(|cap| {
            let body = cap.get(1)?.as_str();
            let value: serde_json::Value = serde_json::from_str(body).ok()?;
            let tool_name = value.get("tool_name")?.as_str()?.to_string();
            let parameters = value.get("parameters").cloned().unwrap_or(serde_json::Value::Null);
            Some(ToolCall { call_id: CallId::generate(), tool_name, parameters })
        })
        .collect()
}

fn find_final_answer(text: &str) -> Option<String> {
    text.lines().find_map(|line| line.trim_start().strip_prefix(FINAL_ANSWER_MARKER)).map(|rest| rest.trim().to_string())
}

/// Lines starting with `FINDING:`, the model's convention for recording a
/// discovery (§4.6 "2-Action rule"). Same line-scan shape as
/// [`find_final_answer`], applied to every turn rather than just the last.
fn find_findings(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.trim_start().strip_prefix(FINDING_MARKER))
        .map(|rest| rest.trim().to_string())
        .collect()
}
