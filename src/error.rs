use thiserror::Error;

#[derive(Debug, Error)]
pub enum PocketError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Pocket reports failures through the X-Error-Code and X-Error headers.
    #[error("{endpoint} returned {status} (code {code}): {message}")]
    Api {
        endpoint: &'static str,
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PocketError>;
