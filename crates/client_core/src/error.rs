use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("invalid api base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("unsupported scheme '{scheme}' in api base url '{url}'")]
    UnsupportedScheme { url: String, scheme: String },
    #[error("api base url '{url}' cannot carry {part}")]
    BaseUrlShape { url: String, part: &'static str },
    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },
    #[error("{url} responded with {status}")]
    Status { url: String, status: StatusCode },
    #[error("stream from {url} was interrupted: {source}")]
    Stream { url: String, source: reqwest::Error },
    #[error("could not decode response from {url}: {source}")]
    Decode { url: String, source: reqwest::Error },
}

impl ApiClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the backend could not be reached at all (refused, DNS, timeout).
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_connect() || source.is_timeout(),
            _ => false,
        }
    }
}
