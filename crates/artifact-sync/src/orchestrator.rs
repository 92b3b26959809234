//! SyncOrchestrator: the session state machine
//!
//! Decides whether the raw artifact must be fetched, whether the compiled
//! artifact must be rebuilt, and returns the loaded compiled form.

use std::path::PathBuf;
use std::sync::Arc;

use artifact_fs::{ArtifactKind, ArtifactStore, Fingerprint};
use artifact_remote::{ArtifactFetcher, FingerprintResolver, HttpRemote, RemoteOptions};

use crate::capability::{ArtifactLoader, CompiledArtifact, Compiler, PathLoader};
use crate::error::{Error, Phase, Result, SyncError};
use crate::request::SyncRequest;
use crate::state::{SyncReport, SyncState};

/// Outcome of a successful session.
#[derive(Debug)]
pub struct Ready<H> {
    /// What the loader produced from the compiled artifact
    pub handle: H,
    pub report: SyncReport,
}

/// Runs synchronization sessions against the given capabilities.
///
/// Sessions are sequential: each step waits on the previous one. Only one
/// session per artifact name may run at a time; a second concurrent session
/// fails in [`Phase::Lock`].
pub struct SyncOrchestrator<H> {
    resolver: Arc<dyn FingerprintResolver>,
    fetcher: Arc<dyn ArtifactFetcher>,
    compiler: Arc<dyn Compiler>,
    loader: Arc<dyn ArtifactLoader<Handle = H>>,
}

impl SyncOrchestrator<CompiledArtifact> {
    /// Orchestrator over the HTTP endpoints that returns the compiled path.
    pub fn http(options: RemoteOptions, compiler: impl Compiler + 'static) -> Result<Self> {
        let remote = HttpRemote::new(options)?;
        Ok(Self::with_remote(remote, compiler, PathLoader))
    }
}

impl<H: Send + 'static> SyncOrchestrator<H> {
    pub fn new(
        resolver: Arc<dyn FingerprintResolver>,
        fetcher: Arc<dyn ArtifactFetcher>,
        compiler: Arc<dyn Compiler>,
        loader: Arc<dyn ArtifactLoader<Handle = H>>,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            compiler,
            loader,
        }
    }

    /// Use one remote for both the fingerprint query and the download.
    pub fn with_remote<R, C, L>(remote: R, compiler: C, loader: L) -> Self
    where
        R: FingerprintResolver + ArtifactFetcher + 'static,
        C: Compiler + 'static,
        L: ArtifactLoader<Handle = H> + 'static,
    {
        let remote = Arc::new(remote);
        Self::new(
            remote.clone(),
            remote,
            Arc::new(compiler),
            Arc::new(loader),
        )
    }

    /// Run one synchronization session.
    ///
    /// # Errors
    ///
    /// Any failure aborts the session and is reported with the phase it came
    /// from. A raw artifact persisted before the failure stays in place.
    pub async fn sync(&self, request: &SyncRequest) -> std::result::Result<Ready<H>, SyncError> {
        let mut session = Session::new(request);
        tracing::info!(name = request.name(), "Synchronizing artifact");

        match self.run(&mut session).await {
            Ok(ready) => Ok(ready),
            Err((phase, source)) => {
                session.enter(SyncState::Failed(source.kind()));
                tracing::warn!(name = request.name(), %phase, "Synchronization failed: {source}");
                Err(SyncError {
                    name: request.name().to_string(),
                    phase,
                    source,
                    transitions: session.transitions,
                })
            }
        }
    }

    async fn run(&self, session: &mut Session<'_>) -> PhaseResult<Ready<H>> {
        session.enter(SyncState::Start);
        let _lock = session.store.lock().in_phase(Phase::Lock)?;

        session.enter(SyncState::CheckLocal);
        let (fingerprint, refreshed) = if session.store.exists(ArtifactKind::Raw) {
            session.enter(SyncState::CheckRemote);
            let local = blocking(&session.store, |store| store.local_fingerprint())
                .await
                .in_phase(Phase::CheckLocal)?;
            let remote = self
                .resolver
                .fetch_latest_fingerprint(session.request.endpoints())
                .await
                .in_phase(Phase::FingerprintFetch)?;

            if local == remote {
                tracing::info!(fingerprint = %local, "Artifact already at the latest version");
                session.enter(SyncState::UpToDate);
                (local, false)
            } else {
                tracing::info!(%local, %remote, "Artifact is stale");
                session.enter(SyncState::Stale);
                (self.fetch(session, Some(&remote)).await?, true)
            }
        } else {
            tracing::info!("No local artifact, retrieving");
            session.enter(SyncState::Missing);
            session.store.ensure_cache_dir().in_phase(Phase::CheckLocal)?;
            (self.fetch(session, None).await?, true)
        };

        session.enter(SyncState::Compiling);
        let compiled_path = self
            .ensure_compiled(session, &fingerprint, refreshed)
            .await?;
        let handle = self.loader.load(&compiled_path).await.in_phase(Phase::Load)?;
        session.enter(SyncState::Ready);

        let report = SyncReport {
            transitions: session.transitions.clone(),
            downloaded: refreshed,
            compiled: session.compiled,
            fingerprint,
            compiled_path,
        };
        Ok(Ready { handle, report })
    }

    /// `Fetching → Persisted`. The previous raw artifact is only replaced by
    /// a complete atomic write. Returns the fingerprint of the new bytes.
    async fn fetch(
        &self,
        session: &mut Session<'_>,
        expected: Option<&Fingerprint>,
    ) -> PhaseResult<Fingerprint> {
        session.enter(SyncState::Fetching);
        let bytes = self
            .fetcher
            .download(session.request.endpoints())
            .await
            .in_phase(Phase::Download)?;

        let fingerprint = session.store.fingerprint_of(&bytes);
        if let Some(expected) = expected {
            if &fingerprint != expected {
                tracing::warn!(
                    %expected,
                    downloaded = %fingerprint,
                    "Downloaded artifact does not match the advertised fingerprint"
                );
            }
        }

        blocking(&session.store, move |store| store.write_raw_bytes(&bytes))
            .await
            .in_phase(Phase::Persist)?;
        session.enter(SyncState::Persisted);
        Ok(fingerprint)
    }

    /// `Compiling`: reuse the compiled artifact unless the raw artifact was
    /// just refreshed, none exists, or it was built from other raw content.
    async fn ensure_compiled(
        &self,
        session: &mut Session<'_>,
        current: &Fingerprint,
        refreshed: bool,
    ) -> PhaseResult<PathBuf> {
        let store = &session.store;

        let reusable = if refreshed || !store.exists(ArtifactKind::Compiled) {
            false
        } else {
            match store.compiled_source().in_phase(Phase::Compile)? {
                Some(source) if &source != current => {
                    tracing::info!(%source, %current, "Compiled artifact was built from other content");
                    false
                }
                _ => true,
            }
        };
        if reusable {
            tracing::debug!(path = %store.compiled_path().display(), "Reusing compiled artifact");
            return Ok(store.compiled_path());
        }

        tracing::info!(raw = %store.raw_path().display(), "Compiling artifact");
        let produced = self
            .compiler
            .compile(&store.raw_path())
            .await
            .in_phase(Phase::Compile)?;
        let current = current.clone();
        let installed = blocking(store, move |store| {
            let installed = store.install_compiled(&produced)?;
            store.record_compiled_source(&current)?;
            Ok(installed)
        })
        .await
        .in_phase(Phase::Compile)?;

        session.compiled = true;
        Ok(installed)
    }
}

type PhaseResult<T> = std::result::Result<T, (Phase, Error)>;

/// Tag an error with the phase it came from.
trait InPhase<T> {
    fn in_phase(self, phase: Phase) -> PhaseResult<T>;
}

impl<T, E: Into<Error>> InPhase<T> for std::result::Result<T, E> {
    fn in_phase(self, phase: Phase) -> PhaseResult<T> {
        self.map_err(|e| (phase, e.into()))
    }
}

struct Session<'a> {
    request: &'a SyncRequest,
    store: ArtifactStore,
    transitions: Vec<SyncState>,
    compiled: bool,
}

impl<'a> Session<'a> {
    fn new(request: &'a SyncRequest) -> Self {
        Self {
            request,
            store: request.store(),
            transitions: Vec::new(),
            compiled: false,
        }
    }

    fn enter(&mut self, state: SyncState) {
        tracing::debug!(name = self.request.name(), ?state, "Session transition");
        self.transitions.push(state);
    }
}

/// Run a store operation on the blocking pool.
async fn blocking<T, F>(store: &ArtifactStore, operation: F) -> Result<T>
where
    F: FnOnce(&ArtifactStore) -> artifact_fs::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || operation(&store))
        .await
        .map_err(|e| Error::Task {
            message: e.to_string(),
        })?
        .map_err(Error::from)
}
