use std::fmt;

/// Result type for corex-providers operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The underlying HTTP transport failed.
    Transport(reqwest::Error),
    /// The provider returned a response this client could not parse.
    Protocol(String),
    /// A tool name was not found at invocation time.
    UnknownTool(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "transport error: {err}"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::UnknownTool(name) => write!(f, "unknown tool: {name}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(err) => Some(err),
            Error::Protocol(_) | Error::UnknownTool(_) => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err)
    }
}

impl From<Error> for corex_types::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Transport(e) => corex_types::Error::ToolTransient(e.to_string()),
            Error::Protocol(msg) => corex_types::Error::Internal(msg),
            Error::UnknownTool(name) => corex_types::Error::ToolUnknown(name),
        }
    }
}
