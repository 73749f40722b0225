use std::sync::Arc;

/// Represents a result type for operations in the Hyphen Toggle client.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in the Hyphen Toggle client.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Every horizon URL failed. Holds the failure of the last URL that was tried (connection
    /// error, timeout or non-2xx status).
    #[error("toggle request failed: {0}")]
    Transport(Arc<reqwest::Error>),

    /// Request body could not be encoded or response body could not be decoded.
    #[error("failed to serialize toggle payload: {0}")]
    Serialization(Arc<serde_json::Error>),

    /// The requested toggle is missing from the evaluation response, or the service returned an
    /// error for it.
    #[error("evaluation for {flag_key:?} is missing: {}", message.as_deref().unwrap_or("evaluation does not exist"))]
    EvaluationMissing {
        /// Key of the requested toggle.
        flag_key: String,
        /// Error message returned by the service, if any.
        message: Option<String>,
    },

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Configuration(&'static str),

    /// A horizon URL could not be parsed.
    #[error("invalid horizon url {url:?}")]
    InvalidHorizonUrl {
        /// The offending URL.
        url: String,
        /// Parse error.
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    HttpClient(Arc<reqwest::Error>),

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Indicates that the telemetry thread panicked. This should normally never happen.
    #[error("telemetry thread panicked")]
    TelemetryThreadPanicked,
}

impl Error {
    /// Returns HTTP status code if the error was caused by a non-2xx response.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Error::Transport(err) => err.status(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Transport(Arc::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Serialization(Arc::new(value))
    }
}
