//! Construction-time options for [`TileCache`](super::TileCache).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;
use crate::freshness::{AgePolicy, FreshnessPolicy};
use crate::path::{PathFn, PathResolver, PathTemplate};
use crate::request::TileRequest;

/// Builder for cache options.
///
/// Exactly one path strategy takes effect, by priority: path function, then
/// path template, then directory. Options are validated when the cache is
/// built, never mid-request.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tile_fs_cache::cache::{CacheOptions, TileCache};
///
/// let options = CacheOptions::<()>::new()
///     .directory("/var/cache/tiles")
///     .max_age(Duration::from_secs(3600))
///     .refresh_age(Duration::from_secs(600));
/// let cache = TileCache::new(options).unwrap();
/// assert_eq!(cache.name(), "disk");
/// ```
pub struct CacheOptions<H> {
    directory: Option<PathBuf>,
    path_template: Option<String>,
    path_fn: Option<PathFn>,
    max_age: AgePolicy<H>,
    refresh_age: AgePolicy<H>,
}

impl<H> CacheOptions<H> {
    pub fn new() -> Self {
        Self {
            directory: None,
            path_template: None,
            path_fn: None,
            max_age: AgePolicy::Unset,
            refresh_age: AgePolicy::Unset,
        }
    }

    /// Store artifacts as `{dir}/{z}/{x}/{y}/{filename}`.
    ///
    /// The directory is created by `initialize`.
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    /// Store artifacts at a templated path (`{layer}`, `{x}`, `{y}`, `{z}`,
    /// `{filename}`).
    pub fn path_template(mut self, template: impl Into<String>) -> Self {
        self.path_template = Some(template.into());
        self
    }

    /// Store artifacts at whatever path `f` returns.
    pub fn path_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&TileRequest) -> PathBuf + Send + Sync + 'static,
    {
        self.path_fn = Some(Arc::new(f));
        self
    }

    /// Serve artifacts younger than `age`. Zero disables the cache.
    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = AgePolicy::Fixed(age);
        self
    }

    /// Compute the max age per request.
    pub fn max_age_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&H, &TileRequest) -> Option<Duration> + Send + Sync + 'static,
    {
        self.max_age = AgePolicy::dynamic(f);
        self
    }

    /// Flag artifacts older than `age` for a background rebuild.
    pub fn refresh_age(mut self, age: Duration) -> Self {
        self.refresh_age = AgePolicy::Fixed(age);
        self
    }

    /// Compute the refresh age per request.
    pub fn refresh_age_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&H, &TileRequest) -> Option<Duration> + Send + Sync + 'static,
    {
        self.refresh_age = AgePolicy::dynamic(f);
        self
    }

    /// Validate and split into the path strategy and freshness policy.
    pub(crate) fn build(self) -> Result<(PathResolver, FreshnessPolicy<H>), ConfigError> {
        let freshness = FreshnessPolicy::new(self.max_age, self.refresh_age)?;

        let paths = if let Some(path_fn) = self.path_fn {
            PathResolver::Function(path_fn)
        } else if let Some(template) = self.path_template {
            PathResolver::Template(PathTemplate::parse(template))
        } else if let Some(dir) = self.directory {
            PathResolver::Directory(dir)
        } else {
            return Err(ConfigError::MissingPathStrategy);
        };

        Ok((paths, freshness))
    }
}

impl<H> Default for CacheOptions<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for CacheOptions<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("directory", &self.directory)
            .field("path_template", &self.path_template)
            .field("path_fn", &self.path_fn.as_ref().map(|_| ".."))
            .field("max_age", &self.max_age)
            .field("refresh_age", &self.refresh_age)
            .finish()
    }
}
