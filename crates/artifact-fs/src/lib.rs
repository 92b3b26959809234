//! Local cache store for synchronized model artifacts
//!
//! Owns the on-disk side of a synchronization session: deterministic cache
//! paths, atomic writes of the raw artifact, content fingerprints, and the
//! replacement of the compiled artifact derived from it.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod io;
pub mod layout;
pub mod lock;
pub mod store;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use fingerprint::{Fingerprint, FingerprintAlgorithm};
pub use layout::{ArtifactKind, CacheLayout, MODELS_DIR};
pub use lock::SessionLock;
pub use store::ArtifactStore;
