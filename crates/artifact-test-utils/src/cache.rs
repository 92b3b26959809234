//! [`TestCache`]: temporary cache root for synchronization scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary cache root laid out as `<root>/models/<name>.<ext>`.
pub struct TestCache {
    temp_dir: TempDir,
}

impl Default for TestCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCache {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root().join("models")
    }

    /// Path of `<name>.<extension>` inside the models directory.
    pub fn file(&self, name: &str, extension: &str) -> PathBuf {
        self.models_dir().join(format!("{name}.{extension}"))
    }

    /// Write a file into the models directory, creating it if needed.
    pub fn seed(&self, name: &str, extension: &str, content: &[u8]) -> PathBuf {
        let path = self.file(name, extension);
        fs::create_dir_all(self.models_dir()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, name: &str, extension: &str) -> Vec<u8> {
        fs::read(self.file(name, extension))
            .unwrap_or_else(|e| panic!("TestCache::read {name}.{extension}: {e}"))
    }

    pub fn assert_missing(&self, name: &str, extension: &str) {
        let path = self.file(name, extension);
        assert!(!path.exists(), "expected {} to be absent", path.display());
    }
}
