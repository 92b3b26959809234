//! Error types for artifact-sync

use std::fmt;

use crate::state::SyncState;

/// Result type for artifact-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while synchronizing an artifact
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Compile capability failed
    #[error("Compilation failed: {message}")]
    Compile { message: String },

    /// Execution engine could not load the compiled artifact
    #[error("Loading compiled artifact failed: {message}")]
    Load { message: String },

    /// Invalid session configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A blocking filesystem task panicked or was cancelled
    #[error("Filesystem task failed: {message}")]
    Task { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from artifact-fs
    #[error(transparent)]
    Fs(#[from] artifact_fs::Error),

    /// Network error from artifact-remote
    #[error(transparent)]
    Remote(#[from] artifact_remote::Error),
}

impl Error {
    pub fn compile(message: impl fmt::Display) -> Self {
        Self::Compile {
            message: message.to_string(),
        }
    }

    pub fn load(message: impl fmt::Display) -> Self {
        Self::Load {
            message: message.to_string(),
        }
    }

    pub fn config(message: impl fmt::Display) -> Self {
        Self::Config {
            message: message.to_string(),
        }
    }

    /// Classify the error for callers deciding whether to retry a session.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Compile { .. } => ErrorKind::Compile,
            Self::Load { .. } => ErrorKind::Load,
            Self::Config { .. } => ErrorKind::Config,
            Self::Task { .. } => ErrorKind::Filesystem,
            Self::Fs(err) => match err {
                artifact_fs::Error::NotFound { .. } => ErrorKind::NotFound,
                artifact_fs::Error::InvalidName { .. }
                | artifact_fs::Error::ConfigParse { .. }
                | artifact_fs::Error::ConfigSerialize { .. }
                | artifact_fs::Error::UnsupportedFormat { .. } => ErrorKind::Config,
                artifact_fs::Error::Io { .. }
                | artifact_fs::Error::LockFailed { .. }
                | artifact_fs::Error::Locked { .. } => ErrorKind::Filesystem,
            },
            Self::Remote(err) => match err {
                artifact_remote::Error::Auth { .. } => ErrorKind::Auth,
                artifact_remote::Error::Decode { .. } => ErrorKind::Decode,
                artifact_remote::Error::EmptyPayload { .. } => ErrorKind::EmptyPayload,
                artifact_remote::Error::InvalidUrl { .. } => ErrorKind::Config,
                artifact_remote::Error::Client(_)
                | artifact_remote::Error::Transport { .. }
                | artifact_remote::Error::Timeout { .. }
                | artifact_remote::Error::Status { .. } => ErrorKind::Network,
            },
        }
    }
}

/// Error taxonomy shared by every phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport failure, timeout, or unexpected HTTP status
    Network,
    /// Bearer token rejected
    Auth,
    /// Malformed fingerprint payload
    Decode,
    /// Expected local file missing
    NotFound,
    /// Directory creation, atomic write, or lock failure
    Filesystem,
    /// Zero-byte download
    EmptyPayload,
    Compile,
    Load,
    /// Invalid endpoints, names, or config files
    Config,
}

/// Step of a session an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Lock,
    CheckLocal,
    FingerprintFetch,
    Download,
    Persist,
    Compile,
    Load,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lock => "lock",
            Self::CheckLocal => "local check",
            Self::FingerprintFetch => "fingerprint fetch",
            Self::Download => "download",
            Self::Persist => "persist",
            Self::Compile => "compile",
            Self::Load => "load",
        };
        f.write_str(name)
    }
}

/// Terminal failure of a synchronization session.
#[derive(Debug, thiserror::Error)]
#[error("Synchronization of {name} failed during {phase}: {source}")]
pub struct SyncError {
    /// Artifact name of the session
    pub name: String,
    pub phase: Phase,
    #[source]
    pub source: Error,
    /// States visited, ending in [`SyncState::Failed`]
    pub transitions: Vec<SyncState>,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
