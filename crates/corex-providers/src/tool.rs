use async_trait::async_trait;
use corex_types::{RiskLevel, SessionId};
use serde_json::Value;
use std::path::PathBuf;

/// Per-invocation context passed to a tool. Carries just enough for a tool
/// to do its job; tools that touch the filesystem are expected to resolve
/// paths against `workspace_root` through the workspace's path-safety check
/// rather than joining paths themselves.
pub struct ToolContext {
    pub session_id: SessionId,
    pub workspace_root: PathBuf,
}

/// A capability the executor can invoke by name. Implementations are
/// registered once at startup; the registry never loads them dynamically.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable name the model refers to in a tool invocation block.
    fn name(&self) -> &str;

    /// Short description surfaced to the planner and router.
    fn description(&self) -> &str;

    /// JSON Schema the tool's parameters must satisfy.
    fn parameter_schema(&self) -> Value;

    /// Risk tier; `Critical` forces the executor's confirmation gate.
    fn risk(&self) -> RiskLevel;

    /// Whether this tool is a pre-built, parameterized workflow the router
    /// may select directly (a "skill"), as opposed to a general-purpose
    /// capability used from within the reasoning/sandboxed-code paths.
    fn is_skill(&self) -> bool {
        false
    }

    /// Whether invoking this tool counts as an information-acquisition
    /// action for the 2-Action rule (web search, URL fetch, and similar
    /// read-only lookups). Most tools are not: writing a file or running
    /// code doesn't discover anything that needs recording as a finding.
    fn is_info_acquisition(&self) -> bool {
        false
    }

    async fn invoke(
        &self,
        params: Value,
        ctx: &ToolContext,
    ) -> std::result::Result<Value, corex_types::Error>;
}

/// Static description of a registered tool, as surfaced to the planner's
/// prompt composition and the router's skill table.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub risk: RiskLevel,
    pub is_skill: bool,
    pub is_info_acquisition: bool,
}
