use corex_index::Database;
use corex_providers::{ModelProvider, ToolRegistry};
use corex_runtime::{CheckpointManager, ConfirmationRegistry, OrchestratorConfig, RunOrchestrator, SandboxPool};
use corex_types::{Event, RequestId, SessionId};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Builds a [`Client`] from an `OrchestratorConfig`, a workspace location,
/// and the capabilities a run needs (model provider, tool registry). Mirrors
/// the orchestrator's own constructor but resolves the workspace paths and
/// opens the checkpoint database for the caller, so embedding code doesn't
/// have to know `corex-index`/`corex-runtime` exist.
pub struct ClientBuilder {
    config: OrchestratorConfig,
    provider: Option<ModelProvider>,
    tools: ToolRegistry,
    workspace_root: Option<PathBuf>,
    workspace_id: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            provider: None,
            tools: ToolRegistry::new(),
            workspace_root: None,
            workspace_id: "default".to_string(),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(mut self, provider: ModelProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn workspace_root(mut self, root: PathBuf) -> Self {
        self.workspace_root = Some(root);
        self
    }

    pub fn workspace_id(mut self, id: impl Into<String>) -> Self {
        self.workspace_id = id.into();
        self
    }

    pub async fn build(self) -> Result<Client> {
        let workspace_root = match self.workspace_root {
            Some(root) => root,
            None => corex_core::resolve_workspace_path(None)?,
        };
        std::fs::create_dir_all(&workspace_root)?;

        let provider = match self.provider {
            Some(provider) => provider,
            None => ModelProvider::Anthropic(self.config.require_model()?.clone()),
        };

        let db_path = workspace_root.join(&self.workspace_id).join("checkpoints.sqlite3");
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Arc::new(Database::open(&db_path)?);
        let checkpoints = Arc::new(CheckpointManager::new(db, self.config.checkpoint_interval, self.config.max_checkpoints));
        let sandbox = Arc::new(SandboxPool::new(
            self.config.sandbox_pool_max,
            self.config.sandbox_pool_min,
            Duration::from_secs(self.config.sandbox_idle_timeout_s),
            self.config.sandbox_max_use_count,
        ));

        let orchestrator = Arc::new(RunOrchestrator::new(
            self.config,
            provider,
            self.tools,
            checkpoints,
            sandbox,
            workspace_root,
            self.workspace_id,
        ));

        Ok(Client { orchestrator })
    }
}

/// The public facade over the agent runtime core. Owns a configured
/// [`RunOrchestrator`] and exposes the three operations an embedder needs:
/// start a run, deliver a confirmation decision, and cancel a run in flight.
#[derive(Clone)]
pub struct Client {
    orchestrator: Arc<RunOrchestrator>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Start a run for `goal` under a freshly generated session id. The
    /// returned [`RunHandle`] streams every emitted event and accepts
    /// confirmation decisions and cancellation requests for the run's
    /// lifetime.
    pub fn run(&self, goal: impl Into<String>) -> RunHandle {
        let session_id = SessionId::generate();
        let (events, confirmations, cancel) = Arc::clone(&self.orchestrator).run_stream(session_id.clone(), goal.into());
        RunHandle { session_id, events, confirmations, cancel }
    }
}

/// A single run in progress: the event stream plus the two signals a caller
/// can push back in — `confirm` for the HITL protocol (§6.2), `cancel` for
/// user-initiated cancellation. Cancellation is cooperative: it records the
/// request so the next suspension point in the driver loop can observe it,
/// rather than aborting the task outright.
pub struct RunHandle {
    session_id: SessionId,
    events: mpsc::Receiver<Event>,
    confirmations: Arc<ConfirmationRegistry>,
    cancel: Arc<std::sync::atomic::AtomicBool>,
}

impl RunHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Await the next event, or `None` once the run has finished and the
    /// stream closed.
    pub async fn recv(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Deliver a confirmation decision for a pending `confirm_required`
    /// request. A decision for an unknown or already-settled `request_id`
    /// is silently ignored, matching the protocol's idempotent-delivery
    /// guarantee.
    pub async fn confirm(&self, request_id: &RequestId, approved: bool) {
        self.confirmations.resolve(request_id, approved).await;
    }

    /// Request cancellation. Best-effort: the driver observes this at its
    /// next suspension point and drains within the configured bound before
    /// emitting a `cancelled` terminal event.
    pub fn cancel(&self) {
        self.cancel.store(true, std::sync::atomic::Ordering::Relaxed);
    }
}

impl From<corex_runtime::Error> for Error {
    fn from(err: corex_runtime::Error) -> Self {
        Error::Runtime(err.to_string())
    }
}
