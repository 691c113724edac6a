//! Shared data types for the agent runtime core: ids, errors, state machine
//! vocabulary, plan/task model, working-memory documents, checkpoints and
//! the client-facing event/tool wire formats. No behavior lives here; every
//! other crate in the workspace depends on this one.

pub mod checkpoint;
pub mod context;
pub mod error;
pub mod event;
pub mod failure;
pub mod ids;
pub mod memory;
pub mod plan;
pub mod routing;
pub mod state;
pub mod task;
pub mod token;
pub mod tool;

pub use checkpoint::Checkpoint;
pub use context::ContextMessage;
pub use error::{Error, Result};
pub use event::{Event, EventPayload, RunOutcome, ToolOutcome};
pub use failure::{FailureKind, FailureRecord};
pub use ids::{CallId, RequestId, SessionId, TaskId};
pub use memory::{DocStatus, Frontmatter, MemoryDoc, MemoryDocument};
pub use plan::{Plan, PlanProgress};
pub use routing::{ExecutionPath, RoutingDecision};
pub use state::{AgentState, Signal, StateHistory, StateRecord};
pub use task::{Task, TaskStatus};
pub use token::TokenCounter;
pub use tool::{RiskLevel, ToolCall, ToolResult, ToolStatus};
