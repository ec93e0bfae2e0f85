//! Filesystem tile cache.
//!
//! The host drives a cache through the [`Cache`] trait: `initialize` once at
//! startup, `get` per request, and `set` after producing a tile on a miss or
//! when a refresh was requested.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                  Host                   │
//! └──────────┬──────────────────┬───────────┘
//!        get │                  │ set
//!            ▼                  ▼
//! ┌─────────────────────────────────────────┐
//! │               TileCache                 │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ PathResolver │  │ FreshnessPolicy │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │ open / fstat / read / write+rename
//!                      ▼
//!                 filesystem
//! ```
//!
//! No artifact state is held in memory. Every call is a fresh round trip to
//! the filesystem, and concurrent calls for the same path are not coordinated.

mod disk;
mod options;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;

use crate::error::CacheError;
use crate::request::TileRequest;

pub use disk::TileCache;
pub use options::CacheOptions;

/// An artifact read back from the cache.
#[derive(Debug, Clone)]
pub struct CachedArtifact {
    /// Stored bytes (may be empty)
    pub content: Bytes,

    /// Response headers; holds only the Content-Type derived from the path
    pub headers: HeaderMap,

    /// The artifact is servable but should be rebuilt in the background
    pub refresh: bool,
}

/// Cache plugin interface consumed by the host.
///
/// `H` is the host context handed to per-request age functions.
#[async_trait]
pub trait Cache<H: Send + Sync + 'static>: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Capture the host and prepare storage.
    ///
    /// The host is captured once. Calling `initialize` again is allowed and
    /// re-runs storage preparation, but age functions keep receiving the
    /// first host.
    async fn initialize(&self, host: Arc<H>) -> Result<(), CacheError>;

    /// Look up a stored artifact. `Ok(None)` is a miss.
    async fn get(
        &self,
        host: &H,
        request: &TileRequest,
    ) -> Result<Option<CachedArtifact>, CacheError>;

    /// Store an artifact. `headers` are not persisted.
    async fn set(
        &self,
        host: &H,
        request: &TileRequest,
        content: Bytes,
        headers: &HeaderMap,
    ) -> Result<(), CacheError>;
}
