//! TileCache integration tests.
//!
//! Tests verify:
//! - Construction-time validation
//! - Reads from a pre-populated directory tree
//! - Max age, refresh age and per-request age functions
//! - Template and function path strategies round-tripping through set/get

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use tempfile::TempDir;

use tile_fs_cache::{CacheOptions, ConfigError, TileCache, TileRequest};

use super::test_utils::{hours, request, SampleTree, TestServer, SAMPLE_JSON, SAMPLE_PBF};

async fn sample_cache(
    tree: &SampleTree,
    options: CacheOptions<TestServer>,
) -> (TileCache<TestServer>, Arc<TestServer>) {
    let cache = TileCache::new(options.directory(tree.root())).unwrap();
    let server = Arc::new(TestServer::new());
    cache.initialize(Arc::clone(&server)).await.unwrap();
    (cache, server)
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_refresh_age_without_max_age_fails_construction() {
    let result = TileCache::<TestServer>::new(
        CacheOptions::new()
            .directory("/tmp")
            .refresh_age(Duration::from_secs(1)),
    );
    let err = result.unwrap_err();
    assert_eq!(err, ConfigError::RefreshAgeWithoutMaxAge);
    assert!(err.to_string().contains("max_age"));
}

#[tokio::test]
async fn test_initialize_creates_parent_folders() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("fs").join("folder");
    let cache: TileCache<TestServer> = TileCache::new(CacheOptions::new().directory(&dir)).unwrap();

    cache.initialize(Arc::new(TestServer::new())).await.unwrap();
    assert!(dir.is_dir());
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_get_text_tile() {
    let tree = SampleTree::new();
    let (cache, server) = sample_cache(&tree, CacheOptions::new()).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.txt"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(artifact.content, Bytes::from_static(b"Hello World"));
    assert_eq!(artifact.headers.len(), 1);
    assert_eq!(artifact.headers[CONTENT_TYPE], "text/plain; charset=UTF-8");
    assert!(!artifact.refresh);
}

#[tokio::test]
async fn test_get_json_tile_has_charset() {
    let tree = SampleTree::new();
    let (cache, server) = sample_cache(&tree, CacheOptions::new()).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.json"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(artifact.content, Bytes::from_static(SAMPLE_JSON));
    assert_eq!(
        artifact.headers[CONTENT_TYPE],
        "application/json; charset=UTF-8"
    );
}

#[tokio::test]
async fn test_get_vector_tile_is_protobuf() {
    let tree = SampleTree::new();
    let (cache, server) = sample_cache(&tree, CacheOptions::new()).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.pbf"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(artifact.content, Bytes::from_static(SAMPLE_PBF));
    assert_eq!(artifact.headers[CONTENT_TYPE], "application/x-protobuf");
}

#[tokio::test]
async fn test_get_without_max_age_serves_old_files() {
    let tree = SampleTree::new();
    tree.set_age("tile.json", hours(24 * 365));
    let (cache, server) = sample_cache(&tree, CacheOptions::new()).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.json"))
        .await
        .unwrap();
    assert!(artifact.is_some());
}

// =============================================================================
// Max Age
// =============================================================================

#[tokio::test]
async fn test_not_returned_if_older_than_max_age() {
    let tree = SampleTree::new();
    tree.set_age("tile.json", hours(1));
    let (cache, server) =
        sample_cache(&tree, CacheOptions::new().max_age(Duration::from_secs(1800))).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.json"))
        .await
        .unwrap();
    assert!(artifact.is_none());
}

#[tokio::test]
async fn test_returned_if_permitted_by_max_age() {
    let tree = SampleTree::new();
    tree.set_age("tile.json", hours(1));
    let (cache, server) =
        sample_cache(&tree, CacheOptions::new().max_age(Duration::from_secs(6000))).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.json"))
        .await
        .unwrap();
    assert!(artifact.is_some());
}

#[tokio::test]
async fn test_max_age_function_permits() {
    let tree = SampleTree::new();
    tree.set_age("tile.json", hours(1));
    let options = CacheOptions::new().max_age_fn(|server: &TestServer, tile: &TileRequest| {
        server.record_age_call();
        assert_eq!(tile.filename, "tile.json");
        Some(Duration::from_secs(6000))
    });
    let (cache, server) = sample_cache(&tree, options).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.json"))
        .await
        .unwrap();

    assert!(artifact.is_some());
    assert!(server.age_calls() > 0, "age function called");
}

#[tokio::test]
async fn test_max_age_function_rejects() {
    let tree = SampleTree::new();
    tree.set_age("tile.json", hours(1));
    let options = CacheOptions::new().max_age_fn(|server: &TestServer, _: &TileRequest| {
        server.record_age_call();
        Some(Duration::from_secs(1800))
    });
    let (cache, server) = sample_cache(&tree, options).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.json"))
        .await
        .unwrap();

    assert!(artifact.is_none());
    assert!(server.age_calls() > 0, "age function called");
}

#[tokio::test]
async fn test_max_age_function_per_layer() {
    let tree = SampleTree::new();
    tree.set_age("tile.json", hours(1));
    let options = CacheOptions::new().max_age_fn(|_: &TestServer, tile: &TileRequest| {
        if tile.layer == "live" {
            Some(Duration::from_secs(60))
        } else {
            None
        }
    });
    let (cache, server) = sample_cache(&tree, options).await;

    assert!(cache
        .get(&server, &request("/live/3/2/1/tile.json"))
        .await
        .unwrap()
        .is_none());
    assert!(cache
        .get(&server, &request("/static/3/2/1/tile.json"))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_skip_get_if_max_age_zero() {
    let tree = SampleTree::new();
    let (cache, server) = sample_cache(&tree, CacheOptions::new().max_age(Duration::ZERO)).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.json"))
        .await
        .unwrap();
    assert!(artifact.is_none());
}

#[tokio::test]
async fn test_skip_set_if_max_age_zero() {
    let tree = SampleTree::new();
    let (cache, server) = sample_cache(&tree, CacheOptions::new().max_age(Duration::ZERO)).await;

    cache
        .set(
            &server,
            &request("/layer/3/2/1/tile.json"),
            Bytes::from_static(b"TEST"),
            &HeaderMap::new(),
        )
        .await
        .unwrap();

    let stored = std::fs::read_to_string(tree.file("tile.json")).unwrap();
    assert_eq!(stored.trim(), "{}");
}

#[tokio::test]
async fn test_max_age_function_returning_zero_disables_per_request() {
    let tree = SampleTree::new();
    let options = CacheOptions::new().max_age_fn(|_: &TestServer, tile: &TileRequest| {
        (tile.layer == "nocache").then_some(Duration::ZERO)
    });
    let (cache, server) = sample_cache(&tree, options).await;

    cache
        .set(
            &server,
            &request("/nocache/3/2/1/tile.json"),
            Bytes::from_static(b"TEST"),
            &HeaderMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(std::fs::read(tree.file("tile.json")).unwrap(), SAMPLE_JSON);

    assert!(cache
        .get(&server, &request("/nocache/3/2/1/tile.json"))
        .await
        .unwrap()
        .is_none());
    assert!(cache
        .get(&server, &request("/cached/3/2/1/tile.json"))
        .await
        .unwrap()
        .is_some());
}

// =============================================================================
// Refresh Age
// =============================================================================

#[tokio::test]
async fn test_refresh_flag_when_older_than_refresh_age() {
    let tree = SampleTree::new();
    tree.set_age("tile.json", hours(1));
    let options = CacheOptions::new()
        .refresh_age(Duration::from_secs(1800))
        .max_age(hours(5));
    let (cache, server) = sample_cache(&tree, options).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.json"))
        .await
        .unwrap()
        .unwrap();

    assert!(artifact.refresh, "refresh flag");
    assert_eq!(artifact.content, Bytes::from_static(b"{}\n"));
    assert_eq!(
        artifact.headers[CONTENT_TYPE],
        "application/json; charset=UTF-8"
    );
}

#[tokio::test]
async fn test_no_refresh_flag_when_younger_than_refresh_age() {
    let tree = SampleTree::new();
    tree.set_age("tile.json", Duration::from_secs(60));
    let options = CacheOptions::new()
        .max_age(hours(5))
        .refresh_age(Duration::from_secs(1800));
    let (cache, server) = sample_cache(&tree, options).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.json"))
        .await
        .unwrap()
        .unwrap();
    assert!(!artifact.refresh);
}

#[tokio::test]
async fn test_refresh_age_function() {
    let tree = SampleTree::new();
    tree.set_age("tile.json", hours(1));
    let options = CacheOptions::new()
        .max_age(hours(5))
        .refresh_age_fn(|server: &TestServer, _: &TileRequest| {
            server.record_age_call();
            Some(Duration::from_secs(60))
        });
    let (cache, server) = sample_cache(&tree, options).await;

    let artifact = cache
        .get(&server, &request("/layer/3/2/1/tile.json"))
        .await
        .unwrap()
        .unwrap();
    assert!(artifact.refresh);
    assert_eq!(server.age_calls(), 1);
}

#[tokio::test]
async fn test_set_resets_age() {
    let tree = SampleTree::new();
    tree.set_age("tile.json", hours(2));
    let options = CacheOptions::new().max_age(hours(1));
    let (cache, server) = sample_cache(&tree, options).await;
    let req = request("/layer/3/2/1/tile.json");

    assert!(cache.get(&server, &req).await.unwrap().is_none());

    cache
        .set(&server, &req, Bytes::from_static(b"{\"v\":2}"), &HeaderMap::new())
        .await
        .unwrap();

    let artifact = cache.get(&server, &req).await.unwrap().unwrap();
    assert_eq!(artifact.content, Bytes::from_static(b"{\"v\":2}"));
}

// =============================================================================
// Path Strategies
// =============================================================================

#[tokio::test]
async fn test_path_template_round_trip() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("fs");
    let cache: TileCache<TestServer> = TileCache::new(
        CacheOptions::new().path_template(format!("{}/{{layer}}-{{x}}-{{y}}-{{z}}-{{filename}}", dir.display())),
    )
    .unwrap();
    let server = Arc::new(TestServer::new());
    let req = request("/mylayer/3/2/1/tile.txt");

    cache.initialize(Arc::clone(&server)).await.unwrap();
    assert!(cache.get(&server, &req).await.unwrap().is_none());

    cache
        .set(&server, &req, Bytes::from_static(b"hello"), &HeaderMap::new())
        .await
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.join("mylayer-2-1-3-tile.txt")).unwrap(),
        "hello"
    );

    let artifact = cache.get(&server, &req).await.unwrap().unwrap();
    assert_eq!(artifact.content, Bytes::from_static(b"hello"));
}

#[tokio::test]
async fn test_path_function_round_trip() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("fs");
    let root = dir.clone();
    let cache: TileCache<TestServer> = TileCache::new(CacheOptions::new().path_fn(move |req| {
        root.join(
            [
                req.layer.clone(),
                req.x.to_string(),
                req.y.to_string(),
                req.z.to_string(),
                req.filename.clone(),
            ]
            .join("-"),
        )
    }))
    .unwrap();
    let server = Arc::new(TestServer::new());
    let req = request("/mylayer/3/2/1/tile.txt");

    cache.initialize(Arc::clone(&server)).await.unwrap();
    assert!(cache.get(&server, &req).await.unwrap().is_none());

    cache
        .set(&server, &req, Bytes::from_static(b"hello"), &HeaderMap::new())
        .await
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.join("mylayer-2-1-3-tile.txt")).unwrap(),
        "hello"
    );

    let artifact = cache.get(&server, &req).await.unwrap().unwrap();
    assert_eq!(artifact.content, Bytes::from_static(b"hello"));
    assert_eq!(cache.resolve_path(&req), PathBuf::from(dir.join("mylayer-2-1-3-tile.txt")));
}

#[tokio::test]
async fn test_set_stores_under_directory_layout() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("fs").join("folder");
    let cache: TileCache<TestServer> = TileCache::new(CacheOptions::new().directory(&dir)).unwrap();
    let server = Arc::new(TestServer::new());

    cache.initialize(Arc::clone(&server)).await.unwrap();
    cache
        .set(
            &server,
            &request("/layer/3/1/2/tile@2x.png"),
            Bytes::from_static(b"contents"),
            &HeaderMap::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.join("3/1/2/tile@2x.png")).unwrap(),
        "contents"
    );
}
