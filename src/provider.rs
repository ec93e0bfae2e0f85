//! Static tile provider.
//!
//! [`StaticProvider`] serves pre-rendered files straight from disk, resolving
//! each request through a [`PathTemplate`]. Unlike the cache, a provider has
//! no fallback, so a missing file is reported as a typed not-found error that
//! the host can turn into a 404.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use tracing::debug;

use crate::content_type::content_type_header;
use crate::error::ProviderError;
use crate::path::PathTemplate;
use crate::request::TileRequest;

const PROVIDER_NAME: &str = "disk";

/// Content returned by a provider.
#[derive(Debug, Clone)]
pub struct ProvidedArtifact {
    pub content: Bytes,
    pub headers: HeaderMap,
}

/// Provider plugin interface consumed by the host.
#[async_trait]
pub trait Provider<H: Send + Sync + 'static>: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Produce the artifact for `request`.
    async fn serve(&self, host: &H, request: &TileRequest)
        -> Result<ProvidedArtifact, ProviderError>;
}

/// Serves files located by a path template.
///
/// # Example
///
/// ```no_run
/// use tile_fs_cache::{StaticProvider, TileRequest};
///
/// #[tokio::main]
/// async fn main() {
///     let provider = StaticProvider::new("/srv/tiles/{layer}/{z}/{x}/{y}/{filename}");
///     let request = TileRequest::new("basemap", 3, 2, 1, "tile.png");
///
///     match provider.serve(&request).await {
///         Ok(artifact) => println!("{} bytes", artifact.content.len()),
///         Err(e) => println!("{} ({})", e, e.status_code()),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StaticProvider {
    template: PathTemplate,

    /// Added to every response after the computed Content-Type
    extra_headers: HeaderMap,
}

impl StaticProvider {
    pub fn new(template: impl Into<PathTemplate>) -> Self {
        Self::with_headers(template, HeaderMap::new())
    }

    /// Create a provider that adds `extra_headers` to every response.
    ///
    /// An extra `Content-Type` replaces the computed one.
    pub fn with_headers(template: impl Into<PathTemplate>, extra_headers: HeaderMap) -> Self {
        Self {
            template: template.into(),
            extra_headers,
        }
    }

    pub fn name(&self) -> &str {
        PROVIDER_NAME
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn resolve_path(&self, request: &TileRequest) -> PathBuf {
        self.template.render(request)
    }

    /// Read the whole file for `request`.
    pub async fn serve(&self, request: &TileRequest) -> Result<ProvidedArtifact, ProviderError> {
        let path = self.resolve_path(request);

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Provider file not found: {}", path.display());
                return Err(ProviderError::NotFound { path });
            }
            Err(e) => return Err(ProviderError::Io { path, source: e }),
        };

        let mut headers = content_type_header(&path);
        for (name, value) in &self.extra_headers {
            headers.insert(name.clone(), value.clone());
        }

        Ok(ProvidedArtifact {
            content: Bytes::from(content),
            headers,
        })
    }
}

#[async_trait]
impl<H: Send + Sync + 'static> Provider<H> for StaticProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn serve(
        &self,
        _host: &H,
        request: &TileRequest,
    ) -> Result<ProvidedArtifact, ProviderError> {
        StaticProvider::serve(self, request).await
    }
}
