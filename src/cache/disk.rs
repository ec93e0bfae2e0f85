//! Disk-backed implementation of [`Cache`].
//!
//! # Read protocol
//!
//! `get` opens the file once and takes both the metadata and the bytes from
//! that same handle. It never stats by path, so a writer replacing the file
//! between the freshness check and the read cannot pair one file's mtime with
//! another file's contents.
//!
//! # Write protocol
//!
//! `set` writes to a temporary file next to the destination and renames it
//! into place. Readers see either the previous artifact or the new one.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use crate::content_type::content_type_header;
use crate::error::{CacheError, ConfigError};
use crate::freshness::{AgeKind, FreshnessPolicy};
use crate::path::PathResolver;
use crate::request::TileRequest;

use super::{Cache, CacheOptions, CachedArtifact};

const CACHE_NAME: &str = "disk";

/// Distinguishes temp files written concurrently by this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Filesystem tile cache with age-based freshness.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use bytes::Bytes;
/// use http::HeaderMap;
/// use tile_fs_cache::{CacheOptions, TileCache, TileRequest};
///
/// #[tokio::main]
/// async fn main() {
///     let options = CacheOptions::new()
///         .directory("/var/cache/tiles")
///         .max_age(Duration::from_secs(3600));
///     let cache = TileCache::new(options).unwrap();
///
///     let host = Arc::new(());
///     cache.initialize(Arc::clone(&host)).await.unwrap();
///
///     let request = TileRequest::new("basemap", 3, 2, 1, "tile.png");
///     match cache.get(&host, &request).await.unwrap() {
///         Some(artifact) => println!("hit: {} bytes", artifact.content.len()),
///         None => {
///             let tile = Bytes::from_static(b"...");
///             cache.set(&host, &request, tile, &HeaderMap::new()).await.unwrap();
///         }
///     }
/// }
/// ```
pub struct TileCache<H> {
    paths: PathResolver,
    freshness: FreshnessPolicy<H>,

    /// Host captured by `initialize`, handed to age functions
    host: OnceLock<Arc<H>>,
}

impl<H> TileCache<H> {
    /// Build a cache from validated options.
    pub fn new(options: CacheOptions<H>) -> Result<Self, ConfigError> {
        let (paths, freshness) = options.build()?;
        Ok(Self {
            paths,
            freshness,
            host: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        CACHE_NAME
    }

    /// The path a request is stored at.
    pub fn resolve_path(&self, request: &TileRequest) -> PathBuf {
        self.paths.resolve(request)
    }

    pub fn path_resolver(&self) -> &PathResolver {
        &self.paths
    }

    pub fn freshness(&self) -> &FreshnessPolicy<H> {
        &self.freshness
    }

    /// Whether `initialize` has captured a host.
    pub fn is_initialized(&self) -> bool {
        self.host.get().is_some()
    }

    /// The captured host, or `fallback` before `initialize` has run.
    fn host_or<'a>(&'a self, fallback: &'a H) -> &'a H {
        self.host.get().map(Arc::as_ref).unwrap_or(fallback)
    }

    /// Evaluate the max age; `Some(ZERO)` means the cache is disabled.
    fn max_age(&self, host: &H, request: &TileRequest) -> Option<Duration> {
        let host = self.host_or(host);
        self.freshness.age_tolerance(AgeKind::MaxAge, host, request)
    }

    /// Capture the host and, for the directory layout, create the root.
    ///
    /// The host is captured once: repeated calls keep the first host and
    /// only redo the directory creation, which succeeds if it already exists.
    pub async fn initialize(&self, host: Arc<H>) -> Result<(), CacheError> {
        if self.host.set(host).is_err() {
            debug!("Cache already initialized, keeping the first host");
        }

        if let Some(dir) = self.paths.directory() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| CacheError::io(dir, e))?;
            debug!("Cache directory ready: {}", dir.display());
        }

        Ok(())
    }

    /// Retrieve a stored artifact.
    ///
    /// Returns `Ok(None)` when the max age is zero, when no file exists, or
    /// when the file is older than the max age. Any other I/O failure is
    /// returned as an error.
    pub async fn get(
        &self,
        host: &H,
        request: &TileRequest,
    ) -> Result<Option<CachedArtifact>, CacheError> {
        let max_age = self.max_age(host, request);
        if max_age == Some(Duration::ZERO) {
            debug!("max_age is zero, skipping lookup for {:?}", request);
            return Ok(None);
        }

        let path = self.paths.resolve(request);
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Cache miss: {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(CacheError::io(path, e)),
        };

        let result = self
            .read_if_fresh(&mut file, &path, max_age, self.host_or(host), request)
            .await;

        // Close before handing the outcome back, on every branch.
        drop(file);
        result
    }

    /// Stat and read through one handle.
    async fn read_if_fresh(
        &self,
        file: &mut File,
        path: &Path,
        max_age: Option<Duration>,
        host: &H,
        request: &TileRequest,
    ) -> Result<Option<CachedArtifact>, CacheError> {
        let metadata = file.metadata().await.map_err(|e| CacheError::io(path, e))?;
        let mtime = metadata.modified().map_err(|e| CacheError::io(path, e))?;

        let verdict = self
            .freshness
            .verdict_at(SystemTime::now(), mtime, max_age, host, request);
        if !verdict.serve {
            debug!("Cache entry stale: {}", path.display());
            return Ok(None);
        }

        let size = usize::try_from(metadata.len()).map_err(|_| {
            CacheError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, "file too large to buffer"),
            )
        })?;

        let mut buffer = vec![0u8; size];
        if size > 0 {
            file.seek(SeekFrom::Start(0))
                .await
                .map_err(|e| CacheError::io(path, e))?;
            file.read_exact(&mut buffer)
                .await
                .map_err(|e| CacheError::io(path, e))?;
        }

        debug!(
            "Cache hit: {} ({} bytes, refresh={})",
            path.display(),
            size,
            verdict.refresh
        );

        Ok(Some(CachedArtifact {
            content: Bytes::from(buffer),
            headers: content_type_header(path),
            refresh: verdict.refresh,
        }))
    }

    /// Store an artifact, creating parent directories as needed.
    ///
    /// A max age of zero makes this a successful no-op. `headers` are
    /// accepted for interface symmetry and are not persisted.
    pub async fn set(
        &self,
        host: &H,
        request: &TileRequest,
        content: Bytes,
        _headers: &HeaderMap,
    ) -> Result<(), CacheError> {
        if self.max_age(host, request) == Some(Duration::ZERO) {
            debug!("max_age is zero, skipping store for {:?}", request);
            return Ok(());
        }

        let path = self.paths.resolve(request);
        write_replacing(&path, &content).await?;
        debug!("Stored {} bytes at {}", content.len(), path.display());
        Ok(())
    }
}

/// Write `content` to a sibling temp file and rename it over `path`.
async fn write_replacing(path: &Path, content: &[u8]) -> Result<(), CacheError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| CacheError::io(parent, e))?;
    }

    let temp = temp_path(path);
    if let Err(e) = fs::write(&temp, content).await {
        remove_temp(&temp).await;
        return Err(CacheError::io(temp, e));
    }
    if let Err(e) = fs::rename(&temp, path).await {
        remove_temp(&temp).await;
        return Err(CacheError::io(path, e));
    }
    Ok(())
}

/// Sibling temp name whose length does not depend on the destination's, so
/// any name the directory accepts can also be written through a temp file.
fn temp_path(path: &Path) -> PathBuf {
    path.with_file_name(format!(
        ".tmp.{}.{}",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ))
}

async fn remove_temp(temp: &Path) {
    if let Err(e) = fs::remove_file(temp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove temp file {}: {}", temp.display(), e);
        }
    }
}

#[async_trait]
impl<H: Send + Sync + 'static> Cache<H> for TileCache<H> {
    fn name(&self) -> &str {
        CACHE_NAME
    }

    async fn initialize(&self, host: Arc<H>) -> Result<(), CacheError> {
        TileCache::initialize(self, host).await
    }

    async fn get(
        &self,
        host: &H,
        request: &TileRequest,
    ) -> Result<Option<CachedArtifact>, CacheError> {
        TileCache::get(self, host, request).await
    }

    async fn set(
        &self,
        host: &H,
        request: &TileRequest,
        content: Bytes,
        headers: &HeaderMap,
    ) -> Result<(), CacheError> {
        TileCache::set(self, host, request, content, headers).await
    }
}

impl<H> std::fmt::Debug for TileCache<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("paths", &self.paths)
            .field("freshness", &self.freshness)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
