//! StaticProvider integration tests.
//!
//! Tests verify:
//! - Existing files are served byte-for-byte with a Content-Type
//! - Missing files produce a 404-bearing "File not found" error
//! - A provider can sit behind a cache as the origin

use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use tempfile::TempDir;

use tile_fs_cache::{CacheOptions, Provider, StaticProvider, TileCache};

use super::test_utils::{request, SampleTree, TestServer, SAMPLE_PBF, SAMPLE_TEXT};

#[tokio::test]
async fn test_serve_file_if_exists() {
    let tree = SampleTree::new();
    let provider = StaticProvider::new(format!("{}/{{z}}/{{x}}/{{y}}/tile.txt", tree.root().display()));

    let artifact = provider
        .serve(&request("/basemap/3/2/1/tile.txt"))
        .await
        .unwrap();

    assert_eq!(artifact.content, Bytes::from_static(SAMPLE_TEXT));
    assert_eq!(artifact.headers.len(), 1);
    assert_eq!(artifact.headers[CONTENT_TYPE], "text/plain; charset=UTF-8");
}

#[tokio::test]
async fn test_serve_vector_tile() {
    let tree = SampleTree::new();
    let provider = StaticProvider::new(format!(
        "{}/{{z}}/{{x}}/{{y}}/{{filename}}",
        tree.root().display()
    ));

    let artifact = provider
        .serve(&request("/roads/3/2/1/tile.pbf"))
        .await
        .unwrap();

    assert_eq!(artifact.content, Bytes::from_static(SAMPLE_PBF));
    assert_eq!(artifact.headers[CONTENT_TYPE], "application/x-protobuf");
}

#[tokio::test]
async fn test_not_found_if_missing() {
    let tree = SampleTree::new();
    let provider = StaticProvider::new(format!(
        "{}/sample-doesnotexist/{{z}}/{{x}}/{{y}}/tile.txt",
        tree.root().display()
    ));

    let err = provider
        .serve(&request("/basemap/3/2/1/tile.txt"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(err.to_string(), "File not found");
}

#[tokio::test]
async fn test_provider_as_cache_origin() {
    let tree = SampleTree::new();
    let provider: Box<dyn Provider<TestServer>> = Box::new(StaticProvider::new(format!(
        "{}/{{z}}/{{x}}/{{y}}/{{filename}}",
        tree.root().display()
    )));

    let cache_dir = TempDir::new().unwrap();
    let cache: TileCache<TestServer> =
        TileCache::new(CacheOptions::new().directory(cache_dir.path())).unwrap();
    let server = Arc::new(TestServer::new());
    cache.initialize(Arc::clone(&server)).await.unwrap();

    let req = request("/basemap/3/2/1/tile.txt");

    // Miss: fetch from the origin and populate the cache.
    assert!(cache.get(&server, &req).await.unwrap().is_none());
    let origin = provider.serve(&server, &req).await.unwrap();
    cache
        .set(&server, &req, origin.content.clone(), &origin.headers)
        .await
        .unwrap();

    // Hit: same bytes, header derived from the cached path.
    let cached = cache.get(&server, &req).await.unwrap().unwrap();
    assert_eq!(cached.content, origin.content);
    assert_eq!(cached.headers[CONTENT_TYPE], origin.headers[CONTENT_TYPE]);
    assert!(cache_dir.path().join("3/2/1/tile.txt").is_file());
}
