//! `TestWorld` pattern for declarative integration test setup: a disposable
//! workspace directory plus a pre-wired [`corex_sdk::Client`] driving runs
//! against a scripted mock model.

use corex_providers::ModelProvider;
use corex_sdk::{Client, Event, EventPayload, OrchestratorConfig};
use tempfile::TempDir;

pub struct TestWorldBuilder {
    provider: ModelProvider,
    config: OrchestratorConfig,
}

impl TestWorldBuilder {
    pub fn new(provider: ModelProvider) -> Self {
        Self { provider, config: OrchestratorConfig::default() }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn build(self) -> TestWorld {
        let temp_dir = TempDir::new().expect("failed to create temp workspace");
        let client = Client::builder()
            .workspace_root(temp_dir.path().to_path_buf())
            .provider(self.provider)
            .config(self.config)
            .build()
            .await
            .expect("failed to build client for test world");
        TestWorld { _temp_dir: temp_dir, client }
    }
}

pub struct TestWorld {
    _temp_dir: TempDir,
    client: Client,
}

impl TestWorld {
    pub fn builder(provider: ModelProvider) -> TestWorldBuilder {
        TestWorldBuilder::new(provider)
    }

    /// Run `goal` to its terminal `done` event, auto-approving every
    /// confirmation request along the way, and return every event observed.
    pub async fn run_to_completion(&self, goal: &str) -> Vec<Event> {
        let mut handle = self.client.run(goal);
        let mut events = Vec::new();
        while let Some(event) = handle.recv().await {
            if let EventPayload::ConfirmRequired { request_id, .. } = &event.payload {
                let request_id = request_id.clone();
                handle.confirm(&request_id, true).await;
            }
            let is_done = matches!(event.payload, EventPayload::Done { .. });
            events.push(event);
            if is_done {
                break;
            }
        }
        events
    }

    /// Start `goal` without driving it to completion, so the caller can
    /// inspect or resolve confirmation requests itself via the returned
    /// handle.
    pub fn run(&self, goal: &str) -> corex_sdk::RunHandle {
        self.client.run(goal)
    }
}
