/// Shared error type used across the Combiner SDK crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// Non-2xx response from the Combiner Service.  `payload` is the parsed
    /// JSON error body when the body was JSON, otherwise the raw text.
    #[error("HTTP {status}: {status_text}")]
    Status {
        status: u16,
        status_text: String,
        payload: serde_json::Value,
    },

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// HTTP status carried by a [`Error::Status`], if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
