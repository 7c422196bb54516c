//! CLI error types.

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status. `body` is its plain-text
    /// explanation, verbatim.
    #[error("server returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("unexpected response from server: {0}")]
    Decode(String),

    #[error("{0}")]
    InvalidArgument(String),
}

impl CliError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CliError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
