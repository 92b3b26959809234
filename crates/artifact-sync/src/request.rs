//! SyncRequest: immutable configuration of one session

use std::path::PathBuf;

use artifact_fs::{ArtifactStore, CacheLayout, FingerprintAlgorithm};
use artifact_remote::RemoteEndpoints;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Artifact name used when the caller does not pick one.
pub const DEFAULT_ARTIFACT_NAME: &str = "model";

/// Everything a session needs to know, passed explicitly to each step.
///
/// Deserializing validates the endpoints and the cache layout the same way
/// the constructors do.
///
/// Cache paths derive from it deterministically:
/// `<cache-root>/models/<name>.<raw-ext>` and
/// `<cache-root>/models/<name>.<compiled-ext>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    endpoints: RemoteEndpoints,
    layout: CacheLayout,
    #[serde(default)]
    algorithm: FingerprintAlgorithm,
}

impl SyncRequest {
    /// Create a request from explicit "latest" and "download" URLs.
    pub fn new(
        latest: impl Into<String>,
        download: impl Into<String>,
        token: impl Into<String>,
        name: impl Into<String>,
        cache_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        let endpoints = RemoteEndpoints::new(latest, download, token)?;
        let layout = CacheLayout::new(cache_root, name)?;
        Ok(Self::from_parts(endpoints, layout))
    }

    /// Create a request whose endpoints are `<base>/latest` and
    /// `<base>/download`.
    pub fn from_base(
        base: &str,
        token: impl Into<String>,
        name: impl Into<String>,
        cache_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        let endpoints = RemoteEndpoints::from_base(base, token)?;
        let layout = CacheLayout::new(cache_root, name)?;
        Ok(Self::from_parts(endpoints, layout))
    }

    pub fn from_parts(endpoints: RemoteEndpoints, layout: CacheLayout) -> Self {
        Self {
            endpoints,
            layout,
            algorithm: FingerprintAlgorithm::default(),
        }
    }

    /// Replace the raw and compiled extensions.
    ///
    /// # Errors
    ///
    /// Fails with a `Config`-kind error when the extensions would make two
    /// cache files share a path.
    pub fn with_extensions(
        mut self,
        raw: impl Into<String>,
        compiled: impl Into<String>,
    ) -> Result<Self> {
        self.layout = self.layout.with_extensions(raw, compiled)?;
        Ok(self)
    }

    pub fn with_algorithm(mut self, algorithm: FingerprintAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn endpoints(&self) -> &RemoteEndpoints {
        &self.endpoints
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn algorithm(&self) -> FingerprintAlgorithm {
        self.algorithm
    }

    pub fn name(&self) -> &str {
        self.layout.name()
    }

    /// Store over this request's cache paths.
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(self.layout.clone(), self.algorithm)
    }
}
