use std::io;

use thiserror::Error;

/// Error surface for the serve loop. Field bootstrap failures are
/// reported separately by `initialize` as `StartupError`.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error in {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Task(String),
}

pub(crate) fn io_err(context: &'static str, source: io::Error) -> ServerError {
    ServerError::Io { context, source }
}
