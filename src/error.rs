use std::path::{Path, PathBuf};

use http::StatusCode;
use thiserror::Error;

/// Errors raised while validating cache options at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A refresh threshold only makes sense relative to a serve threshold
    #[error("\"refresh_age\" must be used in conjunction with \"max_age\"")]
    RefreshAgeWithoutMaxAge,

    /// None of directory, path template or path function was given
    #[error("a path strategy is required: set a directory, a path template or a path function")]
    MissingPathStrategy,
}

/// Errors surfaced by [`TileCache`](crate::cache::TileCache) operations.
///
/// A missing or stale artifact is never an error; it is reported as an
/// absent result instead.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Any filesystem failure other than "does not exist"
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    /// The path the failing operation was acting on.
    pub fn path(&self) -> &Path {
        match self {
            CacheError::Io { path, .. } => path,
        }
    }
}

/// Errors surfaced by [`StaticProvider`](crate::provider::StaticProvider).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The resolved file does not exist (maps to HTTP 404)
    #[error("File not found")]
    NotFound { path: PathBuf },

    /// The file exists but could not be read
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProviderError {
    /// HTTP status the host should answer with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProviderError::NotFound { .. } => StatusCode::NOT_FOUND,
            ProviderError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }
}
