use std::fmt;

/// Result type for corex-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of error kinds produced anywhere in the runtime core.
///
/// Every kind here is load-bearing: propagation policy, retry behavior and
/// client-visible `error` events all switch on this enum. Adding a variant
/// means updating the propagation table in corex-runtime too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A signal was submitted that has no transition from the current state.
    InvalidTransition { state: String, signal: String },
    /// The planner returned a structure violating the plan invariants after repair attempts.
    PlanValidationFailed(String),
    /// Invoked tool name not in the Tool Registry.
    ToolUnknown(String),
    /// Parameters failed the tool's schema check.
    ToolParameterInvalid(String),
    /// Retriable tool error (network, rate limit, unavailable).
    ToolTransient(String),
    /// Non-retriable tool error (bad input, permission, unsupported operation).
    ToolPermanent(String),
    SandboxTimeout,
    SandboxResourceExceeded(String),
    SandboxRejected(String),
    /// Not an error to the user; a flow signal that HITL approval is needed.
    ConfirmationRequired(String),
    ConfirmationDenied,
    ConfirmationTimeout,
    /// Max iterations reached.
    IterationExhausted,
    /// A filesystem path resolved outside the workspace root.
    PathEscape(String),
    /// Re-entrant session acquisition of a shared resource.
    ConcurrentAccess(String),
    /// Anything else; logged and surfaced as a bounded message.
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::PlanValidationFailed(_) => "plan_validation_failed",
            Error::ToolUnknown(_) => "tool_unknown",
            Error::ToolParameterInvalid(_) => "tool_parameter_invalid",
            Error::ToolTransient(_) => "tool_transient",
            Error::ToolPermanent(_) => "tool_permanent",
            Error::SandboxTimeout => "sandbox_timeout",
            Error::SandboxResourceExceeded(_) => "sandbox_resource_exceeded",
            Error::SandboxRejected(_) => "sandbox_rejected",
            Error::ConfirmationRequired(_) => "confirmation_required",
            Error::ConfirmationDenied => "confirmation_denied",
            Error::ConfirmationTimeout => "confirmation_timeout",
            Error::IterationExhausted => "iteration_exhausted",
            Error::PathEscape(_) => "path_escape",
            Error::ConcurrentAccess(_) => "concurrent_access",
            Error::Internal(_) => "internal",
        }
    }

    /// Whether the task executor's per-call retry policy should retry this kind locally.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::ToolTransient(_) | Error::SandboxTimeout)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidTransition { state, signal } => {
                write!(f, "no transition from state '{state}' for signal '{signal}'")
            }
            Error::PlanValidationFailed(msg) => write!(f, "plan validation failed: {msg}"),
            Error::ToolUnknown(name) => write!(f, "unknown tool: {name}"),
            Error::ToolParameterInvalid(msg) => write!(f, "invalid tool parameters: {msg}"),
            Error::ToolTransient(msg) => write!(f, "transient tool error: {msg}"),
            Error::ToolPermanent(msg) => write!(f, "permanent tool error: {msg}"),
            Error::SandboxTimeout => write!(f, "sandbox execution timed out"),
            Error::SandboxResourceExceeded(msg) => write!(f, "sandbox resource exceeded: {msg}"),
            Error::SandboxRejected(msg) => write!(f, "sandbox rejected: {msg}"),
            Error::ConfirmationRequired(op) => write!(f, "confirmation required: {op}"),
            Error::ConfirmationDenied => write!(f, "confirmation denied"),
            Error::ConfirmationTimeout => write!(f, "confirmation timed out"),
            Error::IterationExhausted => write!(f, "iteration budget exhausted"),
            Error::PathEscape(path) => write!(f, "path escapes workspace root: {path}"),
            Error::ConcurrentAccess(session) => {
                write!(f, "concurrent access for session {session}")
            }
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
