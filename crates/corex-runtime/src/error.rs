use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Runtime-level errors: everything below the typed taxonomy in
/// `corex_types::Error` that the orchestrator still needs to surface
/// (config loading, checkpoint persistence, provider plumbing). Any of
/// these that reach a client are converted to `corex_types::Error::Internal`
/// unless a more specific conversion is called out below.
#[derive(Debug)]
pub enum Error {
    Core(corex_types::Error),
    Config(String),
    Io(std::io::Error),
    TomlDe(toml::de::Error),
    TomlSer(toml::ser::Error),
    Index(corex_index::Error),
    Provider(corex_providers::Error),
    Engine(corex_engine::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Core(err) => write!(f, "{err}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::TomlDe(err) => write!(f, "invalid config TOML: {err}"),
            Error::TomlSer(err) => write!(f, "could not serialize config: {err}"),
            Error::Index(err) => write!(f, "checkpoint store error: {err}"),
            Error::Provider(err) => write!(f, "provider error: {err}"),
            Error::Engine(err) => write!(f, "engine error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Core(err) => Some(err),
            Error::Config(_) => None,
            Error::Io(err) => Some(err),
            Error::TomlDe(err) => Some(err),
            Error::TomlSer(err) => Some(err),
            Error::Index(err) => Some(err),
            Error::Provider(err) => Some(err),
            Error::Engine(err) => Some(err),
        }
    }
}

impl From<corex_types::Error> for Error {
    fn from(err: corex_types::Error) -> Self {
        Error::Core(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::TomlDe(err)
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::TomlSer(err)
    }
}

impl From<corex_index::Error> for Error {
    fn from(err: corex_index::Error) -> Self {
        Error::Index(err)
    }
}

impl From<corex_providers::Error> for Error {
    fn from(err: corex_providers::Error) -> Self {
        Error::Provider(err)
    }
}

impl From<corex_engine::Error> for Error {
    fn from(err: corex_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<corex_core::Error> for Error {
    fn from(err: corex_core::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Collapse a runtime error down to the closed taxonomy clients see on the
/// wire. Variants with no precise counterpart become `internal`.
impl From<Error> for corex_types::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(e) => e,
            other => corex_types::Error::Internal(other.to_string()),
        }
    }
}
