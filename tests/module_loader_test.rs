//! Compiled-module tier tests: artifact fetch with retry/backoff, the
//! session-wide unavailability latch, disk caching and the
//! allocate/invoke/free call contract.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ditherlab::{
    dither_progressively_with, Algorithm, BackendSet, ChunkBackend, DeviceProfile, ModuleBackend,
    ModuleConfig, ModuleError, ProgressiveOptions, RenderEvent, RenderOptions, ScalarBackend,
};

use common::{collect_events, white_source};

const MODULE_FIXTURE: &[u8] = include_bytes!("fixtures/threshold_module.wat");

fn fast_config(url: String) -> ModuleConfig {
    let mut config = ModuleConfig::new(url);
    config.retry_base = Duration::from_millis(10);
    config
}

fn fixed_caps() -> &'static DeviceProfile {
    Box::leak(Box::new(DeviceProfile::fixed(4, false, 4096)))
}

async fn serve_fixture() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/module.wasm"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(MODULE_FIXTURE))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_load_and_invoke_contract() {
    let server = serve_fixture().await;
    let backend = ModuleBackend::new(fast_config(format!("{}/module.wasm", server.uri())));

    backend.ensure_loaded().await.expect("fixture module loads");
    assert!(backend.is_loaded());

    // 2x2 gray chunk through the full allocate/write/invoke/read/free path
    let gray = [10u8, 200, 130, 120];
    let rgba = dither_core::intensity::gray_to_rgba(&gray);
    let options = RenderOptions::new(Algorithm::ordered());
    let out = backend
        .process_chunk(&ditherlab::ChunkInput {
            rgba: &rgba,
            gray: &gray,
            width: 2,
            height: 2,
            options: &options,
        })
        .expect("module call succeeds");

    let values: Vec<u8> = out.chunks_exact(4).map(|px| px[0]).collect();
    assert_eq!(values, vec![0, 255, 255, 0], "fixture thresholds at 128");
    assert!(out.chunks_exact(4).all(|px| px[3] == 255));
}

#[tokio::test]
async fn test_load_fetches_once_per_session() {
    let server = serve_fixture().await;
    let backend = ModuleBackend::new(fast_config(format!("{}/module.wasm", server.uri())));

    backend.ensure_loaded().await.expect("first load");
    backend.ensure_loaded().await.expect("second call is a no-op");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "the artifact is fetched exactly once");
}

#[tokio::test]
async fn test_retry_budget_then_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/module.wasm"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let backend = ModuleBackend::new(fast_config(format!("{}/module.wasm", server.uri())));

    let err = backend.ensure_loaded().await.unwrap_err();
    assert!(matches!(err, ModuleError::Fetch(_)), "got {err:?}");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3, "three attempts with backoff, then stop");

    // The tier is now latched unavailable for the session: no new fetches.
    let err = backend.ensure_loaded().await.unwrap_err();
    assert!(matches!(err, ModuleError::Unavailable { attempts: 3 }));
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3, "an unavailable tier never refetches");
}

#[tokio::test]
async fn test_malformed_binary_counts_as_load_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/module.wasm"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not a module".to_vec()))
        .mount(&server)
        .await;

    let backend = ModuleBackend::new(fast_config(format!("{}/module.wasm", server.uri())));
    let err = backend.ensure_loaded().await.unwrap_err();
    assert!(matches!(err, ModuleError::Invalid(_)), "got {err:?}");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3, "malformed binaries are retried too");
}

#[tokio::test]
async fn test_disk_cache_skips_the_network() {
    let server = serve_fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("dither-module.wasm");

    // First session: fetches and writes the cache.
    let backend = ModuleBackend::new(
        fast_config(format!("{}/module.wasm", server.uri())).cache_path(&cache),
    );
    backend.ensure_loaded().await.expect("first session load");
    assert!(cache.exists(), "artifact cached after a successful fetch");

    // Second session: dead URL, but the cache satisfies the load.
    let backend = ModuleBackend::new(
        fast_config("http://127.0.0.1:9/unreachable.wasm".into()).cache_path(&cache),
    );
    backend
        .ensure_loaded()
        .await
        .expect("cache hit avoids the network");
    assert!(backend.is_loaded());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "only the first session hit the network");
}

#[tokio::test]
async fn test_unloadable_module_tier_falls_back_to_scalar() {
    // A job routed at an unloaded module tier downgrades per chunk and
    // still completes through the scalar tier.
    let backend = Arc::new(ModuleBackend::new(fast_config(
        "http://127.0.0.1:9/unreachable.wasm".into(),
    )));
    let backends = Arc::new(BackendSet::new(vec![
        backend as Arc<dyn ChunkBackend>,
        Arc::new(ScalarBackend),
    ]));

    let options = ProgressiveOptions::new(
        white_source(64, 64),
        64,
        64,
        RenderOptions::new(Algorithm::ordered()),
    );
    let (_handle, events) = dither_progressively_with(backends, fixed_caps(), options);
    let events = collect_events(events).await;

    let final_image = events
        .iter()
        .find_map(|e| match e {
            Ok(RenderEvent::Complete(image)) => Some(image),
            _ => None,
        })
        .expect("job completes through the scalar tier");
    assert!(final_image
        .pixels()
        .chunks_exact(4)
        .all(|px| px[0] == 255));
}

#[tokio::test]
async fn test_loaded_module_drives_a_progressive_job() {
    let server = serve_fixture().await;
    let module = Arc::new(ModuleBackend::new(fast_config(format!(
        "{}/module.wasm",
        server.uri()
    ))));
    module.ensure_loaded().await.expect("module loads");

    let backends = Arc::new(BackendSet::new(vec![
        Arc::clone(&module) as Arc<dyn ChunkBackend>,
        Arc::new(ScalarBackend),
    ]));

    let options = ProgressiveOptions::new(
        white_source(64, 64),
        64,
        64,
        RenderOptions::new(Algorithm::ordered()),
    );
    let (_handle, events) = dither_progressively_with(backends, fixed_caps(), options);
    let events = collect_events(events).await;

    let final_image = events
        .iter()
        .find_map(|e| match e {
            Ok(RenderEvent::Complete(image)) => Some(image),
            _ => None,
        })
        .expect("module-backed job completes");
    assert!(
        final_image.pixels().chunks_exact(4).all(|px| px[0] == 255),
        "white input thresholds to white through the module tier"
    );
}
