//! # tile-fs-cache
//!
//! A filesystem-backed artifact cache and static provider for tile servers.
//!
//! Given a tile request (layer, x, y, z, filename) the cache resolves a path
//! on disk, decides whether the stored artifact is still usable, reads or
//! writes its bytes, and attaches the right Content-Type. Request routing and
//! the HTTP surface belong to the host application.
//!
//! ## Features
//!
//! - **Path strategies**: fixed `z/x/y/filename` layout, placeholder
//!   templates, or a caller-supplied function
//! - **Freshness policy**: a max age for serving plus an independent refresh
//!   age that flags artifacts for background rebuilds (stale-while-revalidate)
//! - **Per-request thresholds**: either age may be a function of the host and
//!   request
//! - **Consistent reads**: metadata and bytes come from one open handle
//! - **Replace-on-write**: artifacts are written to a temp file and renamed
//!   into place
//!
//! ## Architecture
//!
//! - [`request`] - Tile request coordinates
//! - [`path`] - Request to path resolution
//! - [`freshness`] - Max age / refresh age policy
//! - [`content_type`] - Content-Type lookup
//! - [`cache`] - The [`Cache`] trait and the disk-backed [`TileCache`]
//! - [`provider`] - The [`Provider`] trait and [`StaticProvider`]
//! - [`config`] - CLI configuration for the `tile-fs-cache` binary
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tile_fs_cache::{CacheOptions, TileCache, TileRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = TileCache::new(
//!         CacheOptions::new()
//!             .directory("/var/cache/tiles")
//!             .max_age(Duration::from_secs(86_400))
//!             .refresh_age(Duration::from_secs(3_600)),
//!     )
//!     .unwrap();
//!     cache.initialize(Arc::new(())).await.unwrap();
//!
//!     let request = TileRequest::parse("/basemap/3/2/1/tile.png").unwrap();
//!     if let Some(artifact) = cache.get(&(), &request).await.unwrap() {
//!         if artifact.refresh {
//!             // serve now, rebuild in the background
//!         }
//!     }
//! }
//! ```

pub mod cache;
pub mod config;
pub mod content_type;
pub mod error;
pub mod freshness;
pub mod path;
pub mod provider;
pub mod request;

// Re-export commonly used types
pub use cache::{Cache, CacheOptions, CachedArtifact, TileCache};
pub use config::{CacheArgs, CheckConfig, Cli, Command, GetConfig, PutConfig, ServeConfig};
pub use content_type::{content_type_for, content_type_header, PROTOBUF_CONTENT_TYPE};
pub use error::{CacheError, ConfigError, ProviderError};
pub use freshness::{AgeFn, AgeKind, AgePolicy, FreshnessPolicy, FreshnessVerdict};
pub use path::{PathFn, PathResolver, PathTemplate, TemplateField};
pub use provider::{ProvidedArtifact, Provider, StaticProvider};
pub use request::TileRequest;
