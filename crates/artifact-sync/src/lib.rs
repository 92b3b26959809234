//! Synchronization orchestrator for cached model artifacts
//!
//! Keeps a local cache holding the artifact version the remote currently
//! serves, and hands back a loaded compiled form of it:
//!
//! - **SyncRequest**: immutable session configuration (endpoints, token,
//!   artifact name, cache root)
//! - **SyncOrchestrator**: the state machine deciding whether to fetch and
//!   whether to recompile
//! - **Compiler / ArtifactLoader**: capabilities supplied by the caller
//!
//! # Architecture
//!
//! ```text
//!              caller / application shell
//!                         |
//!                   artifact-sync
//!                         |
//!            +------------+-------------+
//!            |                          |
//!       artifact-fs               artifact-remote
//! ```
//!
//! # Example
//!
//! ```ignore
//! use artifact_sync::{CommandCompiler, SyncOrchestrator, SyncRequest};
//! use artifact_remote::RemoteOptions;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = SyncRequest::from_base(
//!         "https://models.example.com/starry-night",
//!         "token",
//!         "StarryNight",
//!         "/var/cache/app",
//!     )?;
//!     let compiler = CommandCompiler::new("xcrun")
//!         .args(["coremlcompiler", "compile", "{input}", "{output}"]);
//!     let orchestrator = SyncOrchestrator::http(RemoteOptions::default(), compiler)?;
//!     let ready = orchestrator.sync(&request).await?;
//!     println!("compiled artifact at {}", ready.handle.path.display());
//!     Ok(())
//! }
//! ```

pub mod capability;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod request;
pub mod state;

pub use capability::{ArtifactLoader, CommandCompiler, CompiledArtifact, Compiler, PathLoader};
pub use config::{RequestFile, SessionConfig, default_cache_root, load_session_config};
pub use error::{Error, ErrorKind, Phase, Result, SyncError};
pub use orchestrator::{Ready, SyncOrchestrator};
pub use request::SyncRequest;
pub use state::{SyncReport, SyncState};

// Re-exported so callers rarely need the layer 0 crates directly
pub use artifact_fs::{ArtifactKind, ArtifactStore, CacheLayout, Fingerprint, FingerprintAlgorithm};
pub use artifact_remote::{
    ArtifactFetcher, FingerprintResolver, HttpRemote, RemoteEndpoints, RemoteOptions, RetryPolicy,
};
