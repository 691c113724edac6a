use crate::error::{Error, Result};
use chrono::Utc;
use corex_types::{Plan, PlanProgress, Task, TaskId, TaskStatus};

/// Outcome of the deterministic retry policy consulted by `fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Replan,
    Abort,
}

/// Maintains the current Plan DAG and drives it forward. Holds all mutable
/// per-task state (status, timestamps, retry count, last error); the Plan
/// itself only carries the immutable structure plus that same mutable state
/// as of the last `load`/`replace_plan`.
pub struct Scheduler {
    plan: Plan,
    /// Replans attempted on this session so far. Capped to prevent the
    /// replan/fail cycle from livelocking on one unfixable task.
    replan_count: u32,
    max_replans: u32,
}

impl Scheduler {
    pub fn new(plan: Plan) -> Self {
        Self { plan, replan_count: 0, max_replans: 2 }
    }

    pub fn with_max_replans(mut self, max_replans: u32) -> Self {
        self.max_replans = max_replans;
        self
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn load(&mut self, plan: Plan) -> Result<()> {
        plan.validate().map_err(Error::PlanFailed)?;
        self.plan = plan;
        Ok(())
    }

    /// Pending tasks whose dependencies are all completed, in original plan
    /// order.
    pub fn ready(&self) -> Vec<&Task> {
        self.plan
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .filter(|t| {
                t.dependencies
                    .iter()
                    .all(|dep| self.plan.task(dep).is_some_and(|d| d.status == TaskStatus::Completed))
            })
            .collect()
    }

    pub fn start(&mut self, task_id: &TaskId) -> Result<()> {
        let ready_ids: Vec<TaskId> = self.ready().into_iter().map(|t| t.id.clone()).collect();
        if !ready_ids.contains(task_id) {
            let actual = self.task_status_str(task_id)?;
            return Err(Error::InvalidTaskState { task_id: task_id.to_string(), expected: "ready", actual });
        }
        let task = self.task_mut(task_id)?;
        task.status = TaskStatus::InProgress;
        task.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn complete(&mut self, task_id: &TaskId, _output_summary: impl Into<String>) -> Result<()> {
        self.require_status(task_id, TaskStatus::InProgress)?;
        let task = self.task_mut(task_id)?;
        task.status = TaskStatus::Completed;
        task.completed_at = Some(Utc::now());
        task.error = None;
        Ok(())
    }

    pub fn fail(&mut self, task_id: &TaskId, error: impl Into<String>) -> Result<RetryDecision> {
        self.require_status(task_id, TaskStatus::InProgress)?;
        let error = error.into();
        let task = self.task_mut(task_id)?;
        task.retry_count += 1;
        task.status = TaskStatus::Failed;
        task.error = Some(error);

        if task.retry_count < task.max_retries {
            task.status = TaskStatus::Pending;
            return Ok(RetryDecision::Retry);
        }

        if self.replan_count < self.max_replans {
            Ok(RetryDecision::Replan)
        } else {
            Ok(RetryDecision::Abort)
        }
    }

    /// Record that a replan attempt was made, regardless of outcome. Called
    /// by the orchestrator once the planner has been invoked, so repeated
    /// replan cycles on the same failing task are capped.
    pub fn record_replan_attempt(&mut self) {
        self.replan_count += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.plan.tasks.iter().all(|t| t.status.is_terminal_success())
    }

    pub fn is_blocked(&self) -> bool {
        if self.is_complete() {
            return false;
        }
        let any_in_progress = self.plan.tasks.iter().any(|t| t.status == TaskStatus::InProgress);
        !any_in_progress && self.ready().is_empty()
    }

    pub fn progress(&self) -> PlanProgress {
        PlanProgress::from_plan(&self.plan)
    }

    /// Atomic swap preserving completed tasks whose id stays stable.
    pub fn replace_plan(&mut self, new_plan: Plan) -> Result<()> {
        let merged = self.plan.merge_preserving_progress(&new_plan).map_err(Error::PlanFailed)?;
        self.plan = merged;
        Ok(())
    }

    fn require_status(&self, task_id: &TaskId, expected: TaskStatus) -> Result<()> {
        let task = self.plan.task(task_id).ok_or_else(|| Error::UnknownTask(task_id.to_string()))?;
        if task.status != expected {
            return Err(Error::InvalidTaskState {
                task_id: task_id.to_string(),
                expected: status_name(expected),
                actual: status_name(task.status),
            });
        }
        Ok(())
    }

    fn task_mut(&mut self, task_id: &TaskId) -> Result<&mut Task> {
        self.plan.task_mut(task_id).ok_or_else(|| Error::UnknownTask(task_id.to_string()))
    }

    fn task_status_str(&self, task_id: &TaskId) -> Result<&'static str> {
        self.plan
            .task(task_id)
            .map(|t| status_name(t.status))
            .ok_or_else(|| Error::UnknownTask(task_id.to_string()))
    }
}

fn status_name(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Skipped => "skipped",
    }
}
