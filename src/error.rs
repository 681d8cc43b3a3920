//! Error kinds shared across the navigation core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An unterminated `${...}` variable reference
    #[error("unclosed braced variable")]
    MalformedVariable,

    /// A variable reference with no matching entry in the render context
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// Reserved for stricter path validation; the parser is currently
    /// permissive and never produces this
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// The storage backend failed or could not be reached
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The input buffer could not be tokenized even after close-quote repair
    #[error("unbalanced quoting in input")]
    UnbalancedQuoting,
}

pub type Result<T> = std::result::Result<T, Error>;
