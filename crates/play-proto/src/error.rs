use thiserror::Error;

/// Failure of a single Play server call.  Every variant is a transport
/// failure from the caller's point of view: shown once, never retried.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}")]
    Status { status: reqwest::StatusCode },
    #[error("unreadable response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
