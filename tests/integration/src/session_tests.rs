//! End-to-end sessions over HTTP
//!
//! Each test runs the full flow: stub endpoints -> HttpRemote -> cache on
//! disk -> compile -> load.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use artifact_remote::RemoteOptions;
use artifact_sync::{
    CompiledArtifact, Compiler, Error, ErrorKind, FingerprintAlgorithm, HttpRemote, PathLoader,
    Phase, RetryPolicy, SyncOrchestrator, SyncRequest, SyncState, load_session_config,
};
use artifact_test_utils::{StubResponse, StubServer, TestCache};
use async_trait::async_trait;

const TOKEN: &str = "s3cret";

/// Builds a directory-shaped compiled artifact, like a compiled model bundle.
#[derive(Default)]
struct BundleCompiler {
    calls: AtomicUsize,
}

#[async_trait]
impl Compiler for BundleCompiler {
    async fn compile(&self, raw_path: &Path) -> artifact_sync::Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let raw = std::fs::read(raw_path).map_err(Error::compile)?;
        let bundle = raw_path.with_extension("bundle-build");
        std::fs::create_dir_all(&bundle).map_err(Error::compile)?;
        std::fs::write(bundle.join("weights.bin"), raw).map_err(Error::compile)?;
        std::fs::write(bundle.join("manifest.json"), b"{}").map_err(Error::compile)?;
        Ok(bundle)
    }
}

/// Delegates to a shared compiler so the test can count invocations.
struct Shared(Arc<BundleCompiler>);

#[async_trait]
impl Compiler for Shared {
    async fn compile(&self, raw_path: &Path) -> artifact_sync::Result<PathBuf> {
        self.0.compile(raw_path).await
    }
}

fn md5(bytes: &[u8]) -> String {
    FingerprintAlgorithm::Md5.digest_bytes(bytes).into_inner()
}

async fn serving(payload: &[u8]) -> StubServer {
    let server = StubServer::start().await;
    server.require_token(TOKEN);
    server.set_latest(StubResponse::fingerprint(&md5(payload), "ok"));
    server.set_download(StubResponse::ok(payload.to_vec()));
    server
}

fn request(server: &StubServer, cache: &TestCache) -> SyncRequest {
    SyncRequest::from_base(&server.base_url(), TOKEN, "StarryNight", cache.root()).unwrap()
}

fn orchestrator(
    options: RemoteOptions,
    compiler: &Arc<BundleCompiler>,
) -> SyncOrchestrator<CompiledArtifact> {
    SyncOrchestrator::http(options, Shared(compiler.clone())).unwrap()
}

#[tokio::test]
async fn test_first_session_downloads_compiles_and_loads() {
    let server = serving(b"starry night weights").await;
    let cache = TestCache::new();
    let compiler = Arc::new(BundleCompiler::default());

    let ready = orchestrator(RemoteOptions::default(), &compiler)
        .sync(&request(&server, &cache))
        .await
        .unwrap();

    assert_eq!(server.latest_hits(), 0);
    assert_eq!(server.download_hits(), 1);
    assert_eq!(cache.read("StarryNight", "mlmodel"), b"starry night weights");
    let bundle = cache.file("StarryNight", "mlmodelc");
    assert_eq!(ready.handle.path, bundle);
    assert_eq!(
        std::fs::read(bundle.join("weights.bin")).unwrap(),
        b"starry night weights"
    );
    assert!(
        server
            .authorization_headers()
            .iter()
            .all(|h| h == &format!("Bearer {TOKEN}"))
    );
}

#[tokio::test]
async fn test_repeat_session_only_checks_fingerprint() {
    let server = serving(b"v1").await;
    let cache = TestCache::new();
    let compiler = Arc::new(BundleCompiler::default());
    let orchestrator = orchestrator(RemoteOptions::default(), &compiler);
    let request = request(&server, &cache);

    orchestrator.sync(&request).await.unwrap();
    let ready = orchestrator.sync(&request).await.unwrap();

    assert_eq!(server.latest_hits(), 1);
    assert_eq!(server.download_hits(), 1);
    assert_eq!(compiler.calls.load(Ordering::SeqCst), 1);
    assert!(ready.report.visited(SyncState::UpToDate));
}

#[tokio::test]
async fn test_new_remote_version_replaces_bundle() {
    let server = serving(b"v1").await;
    let cache = TestCache::new();
    let compiler = Arc::new(BundleCompiler::default());
    let orchestrator = orchestrator(RemoteOptions::default(), &compiler);
    let request = request(&server, &cache);
    orchestrator.sync(&request).await.unwrap();

    server.set_latest(StubResponse::fingerprint(&md5(b"v2"), "ok"));
    server.set_download(StubResponse::ok(b"v2".to_vec()));
    let ready = orchestrator.sync(&request).await.unwrap();

    assert!(ready.report.visited(SyncState::Stale));
    assert_eq!(cache.read("StarryNight", "mlmodel"), b"v2");
    assert_eq!(
        std::fs::read(ready.handle.path.join("weights.bin")).unwrap(),
        b"v2"
    );
    assert_eq!(compiler.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_wrong_token_fails_with_auth() {
    let server = serving(b"v1").await;
    let cache = TestCache::new();
    let compiler = Arc::new(BundleCompiler::default());
    let request =
        SyncRequest::from_base(&server.base_url(), "wrong", "StarryNight", cache.root()).unwrap();

    let err = orchestrator(RemoteOptions::default(), &compiler)
        .sync(&request)
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::Download);
    assert_eq!(err.kind(), ErrorKind::Auth);
    cache.assert_missing("StarryNight", "mlmodel");
}

#[tokio::test]
async fn test_malformed_fingerprint_payload_is_decode_error() {
    let server = serving(b"v1").await;
    server.set_latest(StubResponse::ok(br#"{"md5":"abc"}"#.to_vec()));
    let cache = TestCache::new();
    cache.seed("StarryNight", "mlmodel", b"old");
    let compiler = Arc::new(BundleCompiler::default());

    let err = orchestrator(RemoteOptions::default(), &compiler)
        .sync(&request(&server, &cache))
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::FingerprintFetch);
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(server.download_hits(), 0);
    assert_eq!(cache.read("StarryNight", "mlmodel"), b"old");
}

#[tokio::test]
async fn test_transient_failures_are_retried_when_enabled() {
    let server = serving(b"v1").await;
    server.fail_download(2, 503);
    let cache = TestCache::new();
    let compiler = Arc::new(BundleCompiler::default());
    let options = RemoteOptions::default().with_retry(
        RetryPolicy::attempts(3).with_intervals(Duration::from_millis(5), Duration::from_millis(20)),
    );

    let ready = orchestrator(options, &compiler)
        .sync(&request(&server, &cache))
        .await
        .unwrap();

    assert_eq!(server.download_hits(), 3);
    assert!(ready.report.downloaded);
}

#[tokio::test]
async fn test_transient_failure_without_retry_is_network_error() {
    let server = serving(b"v1").await;
    server.fail_download(1, 503);
    let cache = TestCache::new();
    let compiler = Arc::new(BundleCompiler::default());

    let err = orchestrator(RemoteOptions::default(), &compiler)
        .sync(&request(&server, &cache))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(server.download_hits(), 1);
    assert_eq!(err.transitions.last(), Some(&SyncState::Failed(ErrorKind::Network)));
}

#[tokio::test]
async fn test_slow_download_hits_deadline() {
    let server = serving(b"v1").await;
    server.set_download(StubResponse::ok(b"v1".to_vec()).delayed(Duration::from_secs(2)));
    let cache = TestCache::new();
    let compiler = Arc::new(BundleCompiler::default());
    let options = RemoteOptions::default().with_timeout(Duration::from_millis(100));

    let err = orchestrator(options, &compiler)
        .sync(&request(&server, &cache))
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::Download);
    assert_eq!(err.kind(), ErrorKind::Network);
    cache.assert_missing("StarryNight", "mlmodel");
}

#[tokio::test]
async fn test_session_from_config_file() {
    let server = serving(b"configured").await;
    let cache = TestCache::new();
    let config_path = cache.root().join("session.toml");
    std::fs::write(
        &config_path,
        format!(
            "endpoint = \"{}\"\ntoken = \"{TOKEN}\"\nname = \"Configured\"\ncache_root = {:?}\ntimeout_secs = 10\n",
            server.base_url(),
            cache.root().to_string_lossy(),
        ),
    )
    .unwrap();

    let config = load_session_config(&config_path).unwrap();
    let remote = HttpRemote::new(config.remote).unwrap();
    let compiler = BundleCompiler::default();
    let orchestrator = SyncOrchestrator::with_remote(remote, compiler, PathLoader);

    let ready = orchestrator.sync(&config.request).await.unwrap();

    assert_eq!(ready.handle.path, cache.file("Configured", "mlmodelc"));
    assert_eq!(cache.read("Configured", "mlmodel"), b"configured");
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_compiler_program() {
    use artifact_sync::CommandCompiler;

    let server = serving(b"raw").await;
    let cache = TestCache::new();
    let compiler = CommandCompiler::new("cp").args(["{input}", "{output}"]);

    let ready = SyncOrchestrator::http(RemoteOptions::default(), compiler)
        .unwrap()
        .sync(&request(&server, &cache))
        .await
        .unwrap();

    assert_eq!(std::fs::read(&ready.handle.path).unwrap(), b"raw");
    assert!(ready.report.compiled);
}
