use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Config(corex_core::Error),
    Index(corex_index::Error),
    Runtime(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Config(e) => write!(f, "config error: {e}"),
            Error::Index(e) => write!(f, "index error: {e}"),
            Error::Runtime(msg) => write!(f, "runtime error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<corex_core::Error> for Error {
    fn from(err: corex_core::Error) -> Self {
        Error::Config(err)
    }
}

impl From<corex_index::Error> for Error {
    fn from(err: corex_index::Error) -> Self {
        Error::Index(err)
    }
}
