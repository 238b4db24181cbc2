use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = YahooError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum YahooError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] reqwest::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid period/interval combination: {0}")]
    InvalidRange(String),
    #[error("unexpected http status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("failed to deserialize payload: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("empty response from {0}")]
    EmptyResponse(String),
    #[error("session handshake failed: {0}")]
    Handshake(String),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}
