//! Session states and the report of a finished session

use std::path::PathBuf;

use artifact_fs::Fingerprint;

use crate::error::ErrorKind;

/// States of a synchronization session.
///
/// ```text
/// Start → CheckLocal ─┬─ Missing ───────────────┐
///                     └─ CheckRemote ─┬─ Stale ─┴─ Fetching → Persisted ─┐
///                                     └─ UpToDate ───────────────────────┴─ Compiling → Ready
/// ```
///
/// Any state may end in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    Start,
    CheckLocal,
    CheckRemote,
    UpToDate,
    Stale,
    Missing,
    Fetching,
    Persisted,
    Compiling,
    Ready,
    Failed(ErrorKind),
}

/// What a successful session did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// States visited, from `Start` to `Ready`
    pub transitions: Vec<SyncState>,
    /// Whether fresh raw bytes were downloaded and persisted
    pub downloaded: bool,
    /// Whether the compile capability ran
    pub compiled: bool,
    /// Fingerprint of the raw artifact the handle was derived from
    pub fingerprint: Fingerprint,
    pub compiled_path: PathBuf,
}

impl SyncReport {
    pub fn visited(&self, state: SyncState) -> bool {
        self.transitions.contains(&state)
    }
}
