use crate::ids::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Status of a single atomic unit of work.
///
/// `Completed` and `Skipped` are monotonic within a Plan instance: once set
/// they are never unset. `Failed` may be cleared back to `Pending`, but only
/// when the scheduler resets the task for a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Skipped)
    }
}

/// Atomic unit of work produced by the planner and driven by the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    /// Single verifiable acceptance criterion (planner rule of thumb: one per task).
    pub acceptance_criterion: String,
    /// Ordered set of suggested tool names, most relevant first.
    pub tool_hints: Vec<String>,
    pub status: TaskStatus,
    pub dependencies: BTreeSet<TaskId>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Task {
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        description: impl Into<String>,
        acceptance_criterion: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            acceptance_criterion: acceptance_criterion.into(),
            tool_hints: Vec::new(),
            status: TaskStatus::Pending,
            dependencies: BTreeSet::new(),
            retry_count: 0,
            max_retries: 3,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies = deps.into_iter().collect();
        self
    }

    pub fn with_tool_hints(mut self, hints: impl IntoIterator<Item = String>) -> Self {
        self.tool_hints = hints.into_iter().collect();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_starts_pending_with_no_attempts() {
        let t = Task::new(TaskId::new("t1"), "Title", "Desc", "Criterion");
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.retry_count, 0);
        assert!(t.dependencies.is_empty());
    }
}
