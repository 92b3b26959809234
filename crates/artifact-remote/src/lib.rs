//! Remote side of artifact synchronization
//!
//! - [`FingerprintResolver`]: asks the "latest" endpoint for the current
//!   artifact fingerprint
//! - [`ArtifactFetcher`]: downloads the raw artifact bytes without touching
//!   the disk
//! - [`HttpRemote`]: the bearer-token HTTP implementation of both, with an
//!   optional bounded retry around transient failures

pub mod client;
pub mod endpoints;
pub mod error;
pub mod options;
pub mod payload;

use artifact_fs::Fingerprint;
use async_trait::async_trait;

pub use client::HttpRemote;
pub use endpoints::RemoteEndpoints;
pub use error::{Error, Result};
pub use options::{RemoteOptions, RetryPolicy};
pub use payload::FingerprintPayload;

/// Source of the remote "latest" fingerprint.
#[async_trait]
pub trait FingerprintResolver: Send + Sync {
    /// Fetch the fingerprint of the artifact the remote currently serves.
    async fn fetch_latest_fingerprint(&self, endpoints: &RemoteEndpoints) -> Result<Fingerprint>;
}

/// Source of the raw artifact bytes.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Download the full artifact. Never writes to disk.
    async fn download(&self, endpoints: &RemoteEndpoints) -> Result<Vec<u8>>;
}
