use thiserror::Error;

use mtrack_expand::ConfigError;

/// Instrumentor errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Script { line: usize, message: String },
    #[error("method `{method}`: {source}")]
    Method {
        method: String,
        #[source]
        source: ConfigError,
    },
}

impl Error {
    pub(crate) fn script(line: usize, message: impl Into<String>) -> Self {
        Self::Script {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn method(method: &str, source: ConfigError) -> Self {
        Self::Method {
            method: method.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
