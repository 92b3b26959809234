//! Deterministic cache paths for one artifact name

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Directory under the cache root that holds every artifact.
pub const MODELS_DIR: &str = "models";

/// Default extension of the raw artifact.
pub const DEFAULT_RAW_EXTENSION: &str = "mlmodel";

/// Default extension of the compiled artifact.
pub const DEFAULT_COMPILED_EXTENSION: &str = "mlmodelc";

const LOCK_EXTENSION: &str = "lock";
const SOURCE_SUFFIX: &str = "source";

/// Which of the two cached forms of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The downloaded payload
    Raw,
    /// The form derived from the raw payload by a compiler
    Compiled,
}

/// Paths of one artifact inside a cache root.
///
/// Everything lives under `<root>/models/`:
///
/// ```text
/// <root>/models/<name>.<raw-ext>
/// <root>/models/<name>.<compiled-ext>
/// <root>/models/<name>.<compiled-ext>.source
/// <root>/models/<name>.lock
/// ```
///
/// Deserializing runs the same checks as [`CacheLayout::new`] and
/// [`CacheLayout::with_extensions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LayoutFields")]
pub struct CacheLayout {
    root: PathBuf,
    name: String,
    raw_extension: String,
    compiled_extension: String,
}

impl CacheLayout {
    /// Create a layout with the default extensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if `name` is empty or would escape the
    /// models directory.
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            root: root.into(),
            name,
            raw_extension: DEFAULT_RAW_EXTENSION.to_string(),
            compiled_extension: DEFAULT_COMPILED_EXTENSION.to_string(),
        })
    }

    /// Replace the raw and compiled extensions. A leading dot is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if an extension is empty or contains a
    /// path separator, if both extensions are equal, or if either would
    /// collide with the lock file or the compiled-source record.
    pub fn with_extensions(
        mut self,
        raw: impl Into<String>,
        compiled: impl Into<String>,
    ) -> Result<Self> {
        let raw = raw.into().trim_start_matches('.').to_string();
        let compiled = compiled.into().trim_start_matches('.').to_string();
        validate_extensions(&raw, &compiled)?;
        self.raw_extension = raw;
        self.compiled_extension = compiled;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_extension(&self) -> &str {
        &self.raw_extension
    }

    pub fn compiled_extension(&self) -> &str {
        &self.compiled_extension
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join(MODELS_DIR)
    }

    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::Raw => self.raw_path(),
            ArtifactKind::Compiled => self.compiled_path(),
        }
    }

    pub fn raw_path(&self) -> PathBuf {
        self.file(&self.raw_extension)
    }

    pub fn compiled_path(&self) -> PathBuf {
        self.file(&self.compiled_extension)
    }

    /// Sidecar recording the raw fingerprint the compiled artifact came from.
    pub fn compiled_source_path(&self) -> PathBuf {
        self.file(&format!("{}.{SOURCE_SUFFIX}", self.compiled_extension))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.file(LOCK_EXTENSION)
    }

    fn file(&self, extension: &str) -> PathBuf {
        self.models_dir().join(format!("{}.{}", self.name, extension))
    }
}

/// Wire form of [`CacheLayout`], validated on conversion.
#[derive(Deserialize)]
struct LayoutFields {
    root: PathBuf,
    name: String,
    raw_extension: String,
    compiled_extension: String,
}

impl TryFrom<LayoutFields> for CacheLayout {
    type Error = Error;

    fn try_from(fields: LayoutFields) -> Result<Self> {
        CacheLayout::new(fields.root, fields.name)?
            .with_extensions(fields.raw_extension, fields.compiled_extension)
    }
}

fn validate_extensions(raw: &str, compiled: &str) -> Result<()> {
    let invalid = |extension: &str, reason: &str| Error::InvalidName {
        name: extension.to_string(),
        reason: reason.to_string(),
    };

    for extension in [raw, compiled] {
        if extension.trim().is_empty() {
            return Err(invalid(extension, "extension is empty"));
        }
        if extension.contains(['/', '\\']) {
            return Err(invalid(extension, "extension contains a path separator"));
        }
        if extension == LOCK_EXTENSION {
            return Err(invalid(extension, "extension is reserved for the session lock"));
        }
    }
    if raw == compiled {
        return Err(invalid(raw, "raw and compiled extensions are equal"));
    }
    if raw == format!("{compiled}.{SOURCE_SUFFIX}") {
        return Err(invalid(raw, "extension is reserved for the compiled-source record"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains(['/', '\\']) {
        return Err(invalid("name contains a path separator"));
    }
    if name == "." || name == ".." {
        return Err(invalid("name is a relative path component"));
    }
    Ok(())
}
