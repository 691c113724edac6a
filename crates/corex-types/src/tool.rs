use crate::ids::CallId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Risk tier assigned to a tool at registration. Drives the executor's
/// confirmation gate: `Critical` tools suspend the run into `waiting_confirm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    Critical,
}

impl RiskLevel {
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, RiskLevel::Critical)
    }
}

/// A parsed tool invocation, as scanned out of a model's delimited output
/// block (`§6.4`): a tool name and a JSON parameter object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: CallId,
    pub tool_name: String,
    pub parameters: Value,
}

/// Outcome of dispatching a `ToolCall` through the registry, normalized
/// before being written back into the executor's context as a delimited
/// tool-result block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: CallId,
    pub tool_name: String,
    pub status: ToolStatus,
    pub output: Option<Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
}

impl ToolResult {
    pub fn success(call_id: CallId, tool_name: impl Into<String>, output: Value) -> Self {
        Self {
            call_id,
            tool_name: tool_name.into(),
            status: ToolStatus::Success,
            output: Some(output),
            error: None,
        }
    }

    pub fn error(call_id: CallId, tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id,
            tool_name: tool_name.into(),
            status: ToolStatus::Error,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Fence-delimited text form injected back into the running context,
    /// matching the block convention the model is prompted to recognize.
    pub fn to_block(&self) -> String {
        let body = serde_json::json!({
            "tool_name": self.tool_name,
            "status": self.status,
            "output": self.output,
            "error": self.error,
        });
        format!("```tool_result\n{}\n```", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_result_carries_output_and_no_error() {
        let r = ToolResult::success(CallId::generate(), "read_file", serde_json::json!({"bytes": 12}));
        assert_eq!(r.status, ToolStatus::Success);
        assert!(r.error.is_none());
        assert!(r.to_block().contains("read_file"));
    }

    #[test]
    fn critical_risk_requires_confirmation_others_do_not() {
        assert!(RiskLevel::Critical.requires_confirmation());
        assert!(!RiskLevel::Low.requires_confirmation());
        assert!(!RiskLevel::Moderate.requires_confirmation());
    }
}
