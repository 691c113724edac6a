//! The agent runtime core: the Agent State Machine, Working Memory Store,
//! Sandbox Pool, Execution Router, Task Executor, Failure Observer, Event
//! Emitter, checkpoint cadence, confirmation protocol, and the Run
//! Orchestrator that composes them with the Task Scheduler and Atomic
//! Planner from `corex-engine`.

pub mod checkpoint;
pub mod confirmation;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod failure;
pub mod memory;
pub mod orchestrator;
pub mod router;
pub mod sandbox;
pub mod state_machine;

pub use checkpoint::CheckpointManager;
pub use confirmation::{ConfirmationRegistry, OrchestratorConfirmationGate};
pub use config::OrchestratorConfig;
pub use error::{Error, Result};
pub use events::EventEmitter;
pub use executor::{AlwaysApprove, ConfirmationGate, ExecutionNotes, ExecutorConfig, TaskExecutor, TaskOutcome};
pub use failure::FailureObserver;
pub use memory::MemoryStore;
pub use orchestrator::RunOrchestrator;
pub use router::ExecutionRouter;
pub use sandbox::{SandboxInstance, SandboxLease, SandboxPool};
pub use state_machine::StateMachine;
