use crate::error::{Error, Result};
use corex_providers::EndpointConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_max_iterations_per_run() -> u32 {
    50
}
fn default_max_iterations_per_task() -> u32 {
    10
}
fn default_tool_call_timeout_s() -> u64 {
    30
}
fn default_checkpoint_interval() -> u32 {
    5
}
fn default_max_checkpoints() -> usize {
    3
}
fn default_findings_record_every_n_actions() -> u32 {
    2
}
fn default_strike_threshold() -> u32 {
    3
}
fn default_sandbox_pool_max() -> usize {
    10
}
fn default_sandbox_pool_min() -> usize {
    2
}
fn default_sandbox_idle_timeout_s() -> u64 {
    300
}
fn default_sandbox_max_use_count() -> u32 {
    100
}
fn default_skill_confidence_threshold() -> f64 {
    0.85
}
fn default_structured_task_threshold() -> f64 {
    0.70
}
fn default_context_summary_trigger_ratio() -> f64 {
    0.70
}
fn default_model_context_window_tokens() -> u64 {
    128_000
}
fn default_context_tail_messages() -> usize {
    6
}
fn default_confirmation_timeout_s() -> u64 {
    300
}
fn default_cancellation_drain_s() -> u64 {
    5
}
fn default_ping_interval_s() -> u64 {
    15
}

/// All tunables from the component design and concurrency sections,
/// collected under one orchestrator-owned configuration. Every field has a
/// documented default so a deserialized partial TOML still produces a
/// usable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_iterations_per_run")]
    pub max_iterations_per_run: u32,
    #[serde(default = "default_max_iterations_per_task")]
    pub max_iterations_per_task: u32,
    #[serde(default = "default_tool_call_timeout_s")]
    pub tool_call_timeout_s: u64,
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,
    #[serde(default = "default_max_checkpoints")]
    pub max_checkpoints: usize,
    #[serde(default = "default_findings_record_every_n_actions")]
    pub findings_record_every_n_actions: u32,
    #[serde(default = "default_strike_threshold")]
    pub strike_threshold: u32,
    #[serde(default = "default_sandbox_pool_max")]
    pub sandbox_pool_max: usize,
    #[serde(default = "default_sandbox_pool_min")]
    pub sandbox_pool_min: usize,
    #[serde(default = "default_sandbox_idle_timeout_s")]
    pub sandbox_idle_timeout_s: u64,
    #[serde(default = "default_sandbox_max_use_count")]
    pub sandbox_max_use_count: u32,
    #[serde(default = "default_skill_confidence_threshold")]
    pub skill_confidence_threshold: f64,
    #[serde(default = "default_structured_task_threshold")]
    pub structured_task_threshold: f64,
    #[serde(default = "default_context_summary_trigger_ratio")]
    pub context_summary_trigger_ratio: f64,
    /// Size of the target model's context window, in tokens. Used only to
    /// compute the progressive-summarization trigger point against
    /// `context_summary_trigger_ratio`; not a hard cap enforced elsewhere.
    #[serde(default = "default_model_context_window_tokens")]
    pub model_context_window_tokens: u64,
    /// Messages kept verbatim at the tail when the context is summarized.
    #[serde(default = "default_context_tail_messages")]
    pub context_tail_messages: usize,
    #[serde(default = "default_confirmation_timeout_s")]
    pub confirmation_timeout_s: u64,
    /// Bound on draining an in-flight LLM stream or tool call after cancellation.
    #[serde(default = "default_cancellation_drain_s")]
    pub cancellation_drain_s: u64,
    /// Maximum idle gap before a `ping` keepalive is emitted.
    #[serde(default = "default_ping_interval_s")]
    pub ping_interval_s: u64,
    /// Model endpoint the planner, router's reasoning fallback, and task
    /// executor all draw from. Distinct providers per role are future work;
    /// one endpoint keeps the orchestrator's composition straightforward.
    #[serde(default)]
    pub model: Option<EndpointConfig>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations_per_run: default_max_iterations_per_run(),
            max_iterations_per_task: default_max_iterations_per_task(),
            tool_call_timeout_s: default_tool_call_timeout_s(),
            checkpoint_interval: default_checkpoint_interval(),
            max_checkpoints: default_max_checkpoints(),
            findings_record_every_n_actions: default_findings_record_every_n_actions(),
            strike_threshold: default_strike_threshold(),
            sandbox_pool_max: default_sandbox_pool_max(),
            sandbox_pool_min: default_sandbox_pool_min(),
            sandbox_idle_timeout_s: default_sandbox_idle_timeout_s(),
            sandbox_max_use_count: default_sandbox_max_use_count(),
            skill_confidence_threshold: default_skill_confidence_threshold(),
            structured_task_threshold: default_structured_task_threshold(),
            context_summary_trigger_ratio: default_context_summary_trigger_ratio(),
            model_context_window_tokens: default_model_context_window_tokens(),
            context_tail_messages: default_context_tail_messages(),
            confirmation_timeout_s: default_confirmation_timeout_s(),
            cancellation_drain_s: default_cancellation_drain_s(),
            ping_interval_s: default_ping_interval_s(),
            model: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: OrchestratorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(corex_core::resolve_workspace_path(None)?.join("config.toml"))
    }

    pub fn require_model(&self) -> Result<&EndpointConfig> {
        self.model.as_ref().ok_or_else(|| Error::Config("no model endpoint configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_iterations_per_run, 50);
        assert_eq!(config.checkpoint_interval, 5);
        assert_eq!(config.sandbox_pool_max, 10);
        assert_eq!(config.sandbox_pool_min, 2);
        assert_eq!(config.skill_confidence_threshold, 0.85);
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = OrchestratorConfig::default();
        config.strike_threshold = 5;
        config.save_to(&path).unwrap();

        let loaded = OrchestratorConfig::load_from(&path).unwrap();
        assert_eq!(loaded.strike_threshold, 5);
    }

    #[test]
    fn load_nonexistent_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let config = OrchestratorConfig::load_from(&path).unwrap();
        assert_eq!(config.max_iterations_per_run, 50);
    }

    #[test]
    fn partial_toml_fills_in_remaining_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "strike_threshold = 7\n").unwrap();

        let config = OrchestratorConfig::load_from(&path).unwrap();
        assert_eq!(config.strike_threshold, 7);
        assert_eq!(config.max_iterations_per_run, 50);
    }
}
