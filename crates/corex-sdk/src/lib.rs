//! Public embedding surface for the agent runtime core. Wraps
//! `corex-runtime`'s [`RunOrchestrator`](corex_runtime::RunOrchestrator) in a
//! `Client`/`RunHandle` pair so host applications (the CLI, a chat frontend,
//! a test harness) drive a run without reaching into the runtime crate's
//! internals directly.

pub mod client;
pub mod error;

pub use client::{Client, ClientBuilder, RunHandle};
pub use error::{Error, Result};

pub use corex_providers::{ModelProvider, Tool, ToolContext, ToolDescriptor, ToolRegistry};
pub use corex_runtime::OrchestratorConfig;
pub use corex_types::{Event, EventPayload, RequestId, RunOutcome, SessionId};
