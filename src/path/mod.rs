//! Mapping tile requests to filesystem paths.
//!
//! Three strategies are supported, chosen once when the cache is built:
//!
//! - [`PathResolver::Directory`]: `{dir}/{z}/{x}/{y}/{filename}`
//! - [`PathResolver::Template`]: a [`PathTemplate`] with `{layer}`, `{x}`,
//!   `{y}`, `{z}` and `{filename}` placeholders
//! - [`PathResolver::Function`]: a caller-supplied mapping
//!
//! # Trust boundary
//!
//! Request fields are written into paths as-is. Nothing here rejects `..`
//! segments or absolute filenames; the host must only hand over requests whose
//! layer and filename are safe to place on disk.

mod template;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::request::TileRequest;

pub use template::{PathTemplate, TemplateField};

/// Caller-supplied request-to-path mapping.
pub type PathFn = Arc<dyn Fn(&TileRequest) -> PathBuf + Send + Sync>;

/// Strategy for resolving the storage path of a request.
#[derive(Clone)]
pub enum PathResolver {
    /// Fixed `z/x/y/filename` layout under a root directory
    Directory(PathBuf),

    /// Placeholder substitution into a template string
    Template(PathTemplate),

    /// Delegate to a function; its result is used uninterpreted
    Function(PathFn),
}

impl PathResolver {
    /// Resolve the path for `request`.
    pub fn resolve(&self, request: &TileRequest) -> PathBuf {
        match self {
            PathResolver::Directory(dir) => directory_path(dir, request),
            PathResolver::Template(template) => template.render(request),
            PathResolver::Function(path_fn) => path_fn(request),
        }
    }

    /// The root directory, for the directory strategy only.
    pub fn directory(&self) -> Option<&Path> {
        match self {
            PathResolver::Directory(dir) => Some(dir),
            _ => None,
        }
    }
}

/// Plain concatenation so that an absolute filename can't replace the root
/// the way `Path::join` would.
fn directory_path(dir: &Path, request: &TileRequest) -> PathBuf {
    let mut path = dir.as_os_str().to_owned();
    for part in [
        request.z.to_string(),
        request.x.to_string(),
        request.y.to_string(),
    ] {
        path.push("/");
        path.push(part);
    }
    path.push("/");
    path.push(&request.filename);
    PathBuf::from(path)
}

impl fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathResolver::Directory(dir) => f.debug_tuple("Directory").field(dir).finish(),
            PathResolver::Template(template) => f.debug_tuple("Template").field(template).finish(),
            PathResolver::Function(_) => f.write_str("Function(..)"),
        }
    }
}
