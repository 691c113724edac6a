use serde::{Deserialize, Serialize};

/// Execution path chosen by the router for a single user turn / task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    Skill,
    SandboxedCode,
    Reasoning,
}

/// Output of the Execution Router: the chosen path, confidence, a short
/// human-readable reason, and the path to fall back to if execution fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub path: ExecutionPath,
    pub confidence: f64,
    pub reason: String,
    pub fallback: Option<ExecutionPath>,
}

impl RoutingDecision {
    pub fn new(path: ExecutionPath, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            path,
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: ExecutionPath) -> Self {
        self.fallback = Some(fallback);
        self
    }
}
