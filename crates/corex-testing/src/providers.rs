//! Canned [`ModelProvider::Mock`] scripts for the run shapes integration
//! tests exercise most often.
//!
//! `ModelProvider::Mock` replays its whole `scripted_text` on every
//! `stream()` call rather than consuming it like a queue, so every
//! consumer in a run — the planner, the task executor's reasoning loop,
//! and its acceptance verifier — sees the same concatenated text. Scripts
//! below put the plan JSON first (the planner takes the first balanced
//! `{...}` span and ignores the rest) and the `FINAL_ANSWER:` marker last
//! with a leading newline, so it lands on its own line regardless of what
//! preceded it.

use crate::fixtures;
use corex_providers::client::MockConfig;
use corex_providers::ModelProvider;

/// A single task that plans, executes, and finishes successfully.
pub fn happy_path(final_answer: &str) -> ModelProvider {
    ModelProvider::Mock(MockConfig {
        scripted_text: vec![
            fixtures::single_task_plan_json("a", "do the thing", "the thing is done"),
            fixtures::final_answer(final_answer),
        ],
    })
}

/// A two-dependent-task plan, for scheduler/dependency-gating tests.
pub fn two_task_chain(final_answer: &str) -> ModelProvider {
    ModelProvider::Mock(MockConfig {
        scripted_text: vec![fixtures::two_task_plan_json("a", "b"), fixtures::final_answer(final_answer)],
    })
}

/// A plan whose only task never reaches a `FINAL_ANSWER:` marker, so the
/// executor exhausts its iteration budget and the task times out.
pub fn plan_with_no_final_answer() -> ModelProvider {
    ModelProvider::Mock(MockConfig { scripted_text: vec![fixtures::single_task_plan_json("a", "stall", "never happens")] })
}
