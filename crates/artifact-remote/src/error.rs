//! Error types for artifact-remote

/// Result type for artifact-remote operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur talking to the remote endpoints
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid endpoint URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Credentials rejected by {url} (HTTP {status})")]
    Auth { url: String, status: u16 },

    #[error("Malformed fingerprint payload from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Empty payload downloaded from {url}")]
    EmptyPayload { url: String },
}

impl Error {
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout {
                url: url.to_string(),
            };
        }
        Self::Transport {
            url: url.to_string(),
            source,
        }
    }

    /// Transport-level failure, including timeouts and unexpected statuses.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Client(_) | Self::Transport { .. } | Self::Timeout { .. } | Self::Status { .. }
        )
    }

    /// Whether repeating the request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
