use crate::error::{Error, Result};
use crate::tool::{Tool, ToolContext, ToolDescriptor};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Name-to-capability mapping. Read-mostly: registration happens at startup,
/// invocation is the only hot path afterward.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Descriptors for every registered tool, in registration order is not
    /// preserved (read-mostly map); callers that need stable planner prompts
    /// should sort by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                risk: t.risk(),
                is_skill: t.is_skill(),
                is_info_acquisition: t.is_info_acquisition(),
            })
            .collect()
    }

    /// Only the tools flagged as skills, for the router's skill-matcher.
    pub fn skills(&self) -> Vec<ToolDescriptor> {
        self.descriptors().into_iter().filter(|d| d.is_skill).collect()
    }

    pub async fn invoke(&self, name: &str, params: Value, ctx: &ToolContext) -> Result<Value> {
        let tool = self.get(name).ok_or_else(|| Error::UnknownTool(name.to_string()))?;
        tool.invoke(params, ctx).await.map_err(|e| Error::Protocol(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use corex_types::RiskLevel;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes its input back."
        }
        fn parameter_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        fn risk(&self) -> RiskLevel {
            RiskLevel::Low
        }
        async fn invoke(&self, params: Value, _ctx: &ToolContext) -> std::result::Result<Value, corex_types::Error> {
            Ok(params)
        }
    }

    #[tokio::test]
    async fn registers_and_invokes_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let ctx = ToolContext {
            session_id: corex_types::SessionId::generate(),
            workspace_root: std::env::temp_dir(),
        };
        let result = registry
            .invoke("echo", serde_json::json!({"x": 1}), &ctx)
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"x": 1}));
    }

    #[tokio::test]
    async fn unknown_tool_name_errors() {
        let registry = ToolRegistry::new();
        let ctx = ToolContext {
            session_id: corex_types::SessionId::generate(),
            workspace_root: std::env::temp_dir(),
        };
        let err = registry.invoke("missing", Value::Null, &ctx).await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool(_)));
    }
}
