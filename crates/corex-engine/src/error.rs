use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The model call backing a plan/replan attempt failed at the transport
    /// or protocol level.
    Provider(corex_providers::Error),
    /// Every repair attempt was exhausted without a structurally valid plan.
    PlanFailed(corex_types::Error),
    /// An operation was attempted on a task the scheduler doesn't recognize.
    UnknownTask(String),
    /// A scheduler operation was called against a task in the wrong status
    /// (e.g. `complete` on a task that isn't `in_progress`).
    InvalidTaskState { task_id: String, expected: &'static str, actual: &'static str },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Provider(err) => write!(f, "planner provider error: {err}"),
            Error::PlanFailed(err) => write!(f, "plan validation failed: {err}"),
            Error::UnknownTask(id) => write!(f, "unknown task: {id}"),
            Error::InvalidTaskState { task_id, expected, actual } => write!(
                f,
                "task '{task_id}' expected status '{expected}' but was '{actual}'"
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<corex_providers::Error> for Error {
    fn from(err: corex_providers::Error) -> Self {
        Error::Provider(err)
    }
}

impl From<Error> for corex_types::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Provider(e) => corex_types::Error::Internal(e.to_string()),
            Error::PlanFailed(e) => e,
            Error::UnknownTask(id) => corex_types::Error::Internal(format!("unknown task: {id}")),
            Error::InvalidTaskState { task_id, expected, actual } => corex_types::Error::Internal(
                format!("task '{task_id}' expected status '{expected}' but was '{actual}'"),
            ),
        }
    }
}
