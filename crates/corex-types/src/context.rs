use serde::{Deserialize, Serialize};

/// One message in a session's running context. Grows append-only during a
/// run; may be trimmed or summarized at well-defined points (see the
/// progressive-summarization rule in corex-runtime).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ContextMessage {
    UserTurn { text: String },
    AssistantTurn { text: String },
    ToolResult { tool_name: String, body: String },
}

impl ContextMessage {
    /// Rough size estimate used for the progressive-summarization trigger.
    /// Not a tokenizer; callers treat this as a conservative proxy.
    pub fn approx_tokens(&self) -> usize {
        let text_len = match self {
            ContextMessage::UserTurn { text } => text.len(),
            ContextMessage::AssistantTurn { text } => text.len(),
            ContextMessage::ToolResult { body, .. } => body.len(),
        };
        text_len.div_ceil(4)
    }
}
