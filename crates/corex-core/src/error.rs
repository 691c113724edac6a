use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure-level errors (config resolution, filesystem access) that
/// sit below the typed runtime taxonomy in `corex_types::Error`. Callers
/// that need a `path_escape` kind convert at the boundary; see
/// [`crate::path::resolve_within`].
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
