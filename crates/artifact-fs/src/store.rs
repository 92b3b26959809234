//! ArtifactStore: on-disk presence of the raw and compiled artifact

use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    ArtifactKind, CacheLayout, Error, Fingerprint, FingerprintAlgorithm, Result, SessionLock, io,
};

/// Owner of one artifact's cache files.
///
/// Paths come from the [`CacheLayout`]; fingerprints use the configured
/// [`FingerprintAlgorithm`], which must match the remote endpoint's.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    layout: CacheLayout,
    algorithm: FingerprintAlgorithm,
}

impl ArtifactStore {
    pub fn new(layout: CacheLayout, algorithm: FingerprintAlgorithm) -> Self {
        Self { layout, algorithm }
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn algorithm(&self) -> FingerprintAlgorithm {
        self.algorithm
    }

    pub fn raw_path(&self) -> PathBuf {
        self.layout.raw_path()
    }

    pub fn compiled_path(&self) -> PathBuf {
        self.layout.compiled_path()
    }

    /// Whether the given form of the artifact is present on disk.
    pub fn exists(&self, kind: ArtifactKind) -> bool {
        let path = self.layout.path(kind);
        match kind {
            ArtifactKind::Raw => path.is_file(),
            // Compiled artifacts may be bundles (directories)
            ArtifactKind::Compiled => path.exists(),
        }
    }

    /// Create `<root>/models` if it does not exist yet.
    pub fn ensure_cache_dir(&self) -> Result<()> {
        let dir = self.layout.models_dir();
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))
    }

    /// Read the raw artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no raw artifact has been persisted.
    pub fn read_raw_bytes(&self) -> Result<Vec<u8>> {
        io::read_bytes(&self.layout.raw_path())
    }

    /// Persist the raw artifact atomically, replacing any previous version.
    pub fn write_raw_bytes(&self, bytes: &[u8]) -> Result<()> {
        let path = self.layout.raw_path();
        io::write_atomic(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Persisted raw artifact");
        Ok(())
    }

    /// Fingerprint of the raw artifact currently on disk.
    pub fn local_fingerprint(&self) -> Result<Fingerprint> {
        self.algorithm.digest_file(&self.layout.raw_path())
    }

    /// Fingerprint the given bytes with this store's algorithm.
    pub fn fingerprint_of(&self, bytes: &[u8]) -> Fingerprint {
        self.algorithm.digest_bytes(bytes)
    }

    /// Move a freshly produced compiled artifact to the compiled path.
    ///
    /// The previous compiled artifact, and the record of which raw
    /// fingerprint it was built from, are discarded.
    pub fn install_compiled(&self, produced: &Path) -> Result<PathBuf> {
        let target = self.layout.compiled_path();
        io::remove_path(&self.layout.compiled_source_path())?;
        io::replace_path(produced, &target)?;
        tracing::debug!(
            from = %produced.display(),
            to = %target.display(),
            "Installed compiled artifact"
        );
        Ok(target)
    }

    /// Raw fingerprint the compiled artifact was built from, if recorded.
    pub fn compiled_source(&self) -> Result<Option<Fingerprint>> {
        match io::read_text(&self.layout.compiled_source_path()) {
            Ok(content) => Ok(Some(Fingerprint::new(content.trim()))),
            Err(Error::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn record_compiled_source(&self, fingerprint: &Fingerprint) -> Result<()> {
        io::write_text(&self.layout.compiled_source_path(), fingerprint.as_str())
    }

    /// Take the exclusive session lock for this artifact.
    pub fn lock(&self) -> Result<SessionLock> {
        SessionLock::acquire(&self.layout.lock_path())
    }
}
