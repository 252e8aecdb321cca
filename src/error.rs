//! Errors raised while fetching question data or avatars.

use reqwest::StatusCode;

/// Coarse classification of a [`FetchError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Decode,
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection, TLS or body read failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request failed with status: {0}")]
    Status(StatusCode),

    /// The server answered without any bytes.
    #[error("response contained no data")]
    EmptyBody,

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("undecodable image: {0}")]
    Image(#[from] image::ImageError),

    #[error("request finished with neither data nor error")]
    Unknown,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Request(_) | Self::Status(_) | Self::EmptyBody => ErrorKind::Transport,
            Self::Payload(_) | Self::Image(_) => ErrorKind::Decode,
            Self::Unknown => ErrorKind::Unknown,
        }
    }
}
