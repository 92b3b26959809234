//! Session configuration files
//!
//! A [`RequestFile`] is the on-disk form of a session: endpoints, token,
//! artifact name and network options. Loading one resolves it into a
//! [`SessionConfig`] ready to hand to the orchestrator.
//!
//! ```toml
//! endpoint = "https://models.example.com/starry-night"
//! token_env = "MODEL_TOKEN"
//! name = "StarryNight"
//! timeout_secs = 30
//! retry_attempts = 3
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use artifact_fs::{CacheLayout, ConfigStore, FingerprintAlgorithm};
use artifact_remote::{RemoteEndpoints, RemoteOptions, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::request::DEFAULT_ARTIFACT_NAME;
use crate::{Error, Result, SyncRequest};

/// Directory created under the platform cache directory.
pub const APP_CACHE_DIR: &str = "artifact-sync";

/// On-disk session configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestFile {
    /// Base URL; expands to `<endpoint>/latest` and `<endpoint>/download`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Environment variable holding the token. Exactly one of `token` and
    /// `token_env` must be set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled_extension: Option<String>,
    #[serde(default)]
    pub algorithm: FingerprintAlgorithm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,
}

/// A resolved session: the request plus the network options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub request: SyncRequest,
    pub remote: RemoteOptions,
}

impl RequestFile {
    /// Resolve against the process environment and the platform cache dir.
    pub fn resolve(self) -> Result<SessionConfig> {
        self.resolve_with(|key| std::env::var(key).ok(), default_cache_root)
    }

    /// Resolve with explicit environment lookup and cache root fallback.
    pub fn resolve_with<E, R>(self, env: E, default_root: R) -> Result<SessionConfig>
    where
        E: Fn(&str) -> Option<String>,
        R: FnOnce() -> Option<PathBuf>,
    {
        let token = match (self.token, self.token_env) {
            (Some(_), Some(_)) => {
                return Err(Error::config("set either `token` or `token_env`, not both"));
            }
            (Some(token), None) if token.trim().is_empty() => {
                return Err(Error::config("`token` is empty"));
            }
            (Some(token), None) => token,
            (None, Some(key)) => env(&key).ok_or_else(|| {
                Error::config(format!("environment variable {key} is not set"))
            })?,
            (None, None) => {
                return Err(Error::config("set `token` or `token_env`"));
            }
        };

        let endpoints = match (self.endpoint, self.latest, self.download) {
            (Some(base), None, None) => RemoteEndpoints::from_base(&base, token)?,
            (None, Some(latest), Some(download)) => {
                RemoteEndpoints::new(latest, download, token)?
            }
            _ => {
                return Err(Error::config(
                    "set either `endpoint`, or both `latest` and `download`",
                ));
            }
        };

        let cache_root = match self.cache_root {
            Some(root) => root,
            None => default_root()
                .ok_or_else(|| Error::config("no `cache_root` and no platform cache directory"))?,
        };

        let name = self.name.unwrap_or_else(|| DEFAULT_ARTIFACT_NAME.to_string());
        let mut layout = CacheLayout::new(cache_root, name)?;
        if self.raw_extension.is_some() || self.compiled_extension.is_some() {
            let raw = self
                .raw_extension
                .unwrap_or_else(|| layout.raw_extension().to_string());
            let compiled = self
                .compiled_extension
                .unwrap_or_else(|| layout.compiled_extension().to_string());
            layout = layout.with_extensions(raw, compiled)?;
        }

        let mut remote = RemoteOptions::default();
        if let Some(secs) = self.timeout_secs {
            remote = remote.with_timeout(Duration::from_secs(secs));
        }
        if let Some(attempts) = self.retry_attempts {
            remote = remote.with_retry(RetryPolicy::attempts(attempts));
        }

        Ok(SessionConfig {
            request: SyncRequest::from_parts(endpoints, layout).with_algorithm(self.algorithm),
            remote,
        })
    }
}

/// Platform cache directory for artifacts, e.g. `~/.cache/artifact-sync`.
pub fn default_cache_root() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_CACHE_DIR))
}

/// Load a `.toml`, `.json` or `.yaml` session file and resolve it.
pub fn load_session_config(path: &Path) -> Result<SessionConfig> {
    let file: RequestFile = ConfigStore::new().load(path)?;
    file.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn root() -> Option<PathBuf> {
        Some(PathBuf::from("/cache"))
    }

    #[test]
    fn base_endpoint_expands_to_latest_and_download() {
        let file = RequestFile {
            endpoint: Some("https://example.com/m".into()),
            token: Some("t0k".into()),
            ..RequestFile::default()
        };

        let config = file.resolve_with(no_env, root).unwrap();

        assert_eq!(config.request.endpoints().latest(), "https://example.com/m/latest");
        assert_eq!(config.request.endpoints().download(), "https://example.com/m/download");
        assert_eq!(config.request.endpoints().token(), "t0k");
        assert_eq!(config.request.name(), "model");
        assert_eq!(
            config.request.store().raw_path(),
            PathBuf::from("/cache/models/model.mlmodel")
        );
        assert_eq!(config.remote, RemoteOptions::default());
    }

    #[test]
    fn token_env_is_looked_up() {
        let file = RequestFile {
            endpoint: Some("https://example.com".into()),
            token_env: Some("MODEL_TOKEN".into()),
            ..RequestFile::default()
        };

        let config = file
            .resolve_with(
                |key| (key == "MODEL_TOKEN").then(|| "from-env".to_string()),
                root,
            )
            .unwrap();

        assert_eq!(config.request.endpoints().token(), "from-env");
    }

    #[test]
    fn unset_token_env_is_config_error() {
        let file = RequestFile {
            endpoint: Some("https://example.com".into()),
            token_env: Some("MODEL_TOKEN".into()),
            ..RequestFile::default()
        };
        let err = file.resolve_with(no_env, root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[rstest]
    #[case::absent(None)]
    #[case::empty(Some(""))]
    #[case::blank(Some("  "))]
    fn missing_token_is_config_error(#[case] token: Option<&str>) {
        let file = RequestFile {
            endpoint: Some("https://example.com".into()),
            token: token.map(str::to_string),
            ..RequestFile::default()
        };
        let err = file.resolve_with(no_env, root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[rstest]
    #[case::same_as_default_compiled(Some("mlmodelc"), None)]
    #[case::same_as_default_raw(None, Some("mlmodel"))]
    #[case::lock(Some("lock"), None)]
    fn colliding_extensions_are_config_error(
        #[case] raw: Option<&str>,
        #[case] compiled: Option<&str>,
    ) {
        let file = RequestFile {
            endpoint: Some("https://example.com".into()),
            token: Some("t0k".into()),
            raw_extension: raw.map(str::to_string),
            compiled_extension: compiled.map(str::to_string),
            ..RequestFile::default()
        };
        let err = file.resolve_with(no_env, root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn endpoint_and_explicit_urls_conflict() {
        let file = RequestFile {
            endpoint: Some("https://example.com".into()),
            latest: Some("https://example.com/latest".into()),
            token: Some("t0k".into()),
            ..RequestFile::default()
        };
        let err = file.resolve_with(no_env, root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn missing_cache_root_without_platform_dir_is_config_error() {
        let file = RequestFile {
            endpoint: Some("https://example.com".into()),
            token: Some("t0k".into()),
            ..RequestFile::default()
        };
        let err = file.resolve_with(no_env, || None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn network_options_and_extensions_apply() {
        let file = RequestFile {
            latest: Some("https://example.com/l".into()),
            download: Some("https://example.com/d".into()),
            token: Some("t0k".into()),
            name: Some("StarryNight".into()),
            cache_root: Some(PathBuf::from("/data")),
            raw_extension: Some("onnx".into()),
            algorithm: FingerprintAlgorithm::Sha256,
            timeout_secs: Some(30),
            retry_attempts: Some(4),
            ..RequestFile::default()
        };

        let config = file.resolve_with(no_env, || None).unwrap();

        let store = config.request.store();
        assert_eq!(store.raw_path(), PathBuf::from("/data/models/StarryNight.onnx"));
        assert_eq!(
            store.compiled_path(),
            PathBuf::from("/data/models/StarryNight.mlmodelc")
        );
        assert_eq!(config.request.algorithm(), FingerprintAlgorithm::Sha256);
        assert_eq!(config.remote.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.remote.retry.max_attempts, 4);
    }

    #[test]
    fn load_session_config_reads_toml() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("session.toml");
        let content = format!(
            "endpoint = \"https://example.com/m\"\ntoken = \"t0k\"\nname = \"StarryNight\"\ncache_root = {:?}\n",
            temp.path().to_string_lossy()
        );
        std::fs::write(&path, content).unwrap();

        let config = load_session_config(&path).unwrap();

        assert_eq!(config.request.name(), "StarryNight");
        assert_eq!(config.request.layout().root(), temp.path());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("session.toml");
        std::fs::write(&path, "endpoint = \"https://example.com\"\ntokn = \"typo\"\n").unwrap();

        let err = load_session_config(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
