//! Command-line configuration for the `tile-fs-cache` binary.
//!
//! The library takes its options through [`CacheOptions`]; this module only
//! maps command-line flags onto it. Every subcommand takes a tile request
//! path of the form `/layer/z/x/y/filename`.
//!
//! # Example
//!
//! ```text
//! tile-fs-cache get --dir /var/cache/tiles --max-age 3600 /basemap/3/2/1/tile.png
//! tile-fs-cache put --dir /var/cache/tiles --input tile.png /basemap/3/2/1/tile.png
//! tile-fs-cache serve --template '/srv/{layer}/{z}/{x}/{y}/{filename}' /basemap/3/2/1/tile.png
//! tile-fs-cache check --dir /var/cache/tiles --max-age 3600 --refresh-age 600 /basemap/3/2/1/tile.png
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::cache::CacheOptions;
use crate::request::TileRequest;

// =============================================================================
// CLI Arguments
// =============================================================================

/// tile-fs-cache - inspect and populate a filesystem tile cache.
#[derive(Parser, Debug, Clone)]
#[command(name = "tile-fs-cache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Read an artifact from the cache.
    Get(GetConfig),

    /// Store an artifact in the cache.
    Put(PutConfig),

    /// Read an artifact through a static provider.
    Serve(ServeConfig),

    /// Show where a request is stored and whether it is fresh.
    Check(CheckConfig),
}

/// Cache layout and freshness flags shared by cache subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct CacheArgs {
    /// Root directory, laid out as {dir}/{z}/{x}/{y}/{filename}.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Path template with {layer}, {x}, {y}, {z} and {filename} placeholders.
    ///
    /// Takes priority over --dir.
    #[arg(long)]
    pub path_template: Option<String>,

    /// Serve artifacts younger than this many seconds (0 disables the cache).
    #[arg(long)]
    pub max_age: Option<u64>,

    /// Flag artifacts older than this many seconds for refresh. Requires --max-age.
    #[arg(long)]
    pub refresh_age: Option<u64>,
}

impl CacheArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.dir.is_none() && self.path_template.is_none() {
            return Err("A cache location is required. Set --dir or --path-template".to_string());
        }
        if self.refresh_age.is_some() && self.max_age.is_none() {
            return Err("--refresh-age must be used in conjunction with --max-age".to_string());
        }
        Ok(())
    }

    /// Translate the flags into cache options.
    pub fn to_options<H>(&self) -> CacheOptions<H> {
        let mut options = CacheOptions::new();
        if let Some(ref dir) = self.dir {
            options = options.directory(dir.clone());
        }
        if let Some(ref template) = self.path_template {
            options = options.path_template(template.clone());
        }
        if let Some(max_age) = self.max_age {
            options = options.max_age(Duration::from_secs(max_age));
        }
        if let Some(refresh_age) = self.refresh_age {
            options = options.refresh_age(Duration::from_secs(refresh_age));
        }
        options
    }
}

fn parse_request(path: &str) -> Result<TileRequest, String> {
    TileRequest::parse(path)
        .ok_or_else(|| format!("Invalid tile request '{}': expected /layer/z/x/y/filename", path))
}

#[derive(Args, Debug, Clone)]
pub struct GetConfig {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Tile request path (/layer/z/x/y/filename).
    pub request: String,

    /// Print a JSON summary instead of the artifact bytes.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl GetConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()?;
        self.tile_request().map(|_| ())
    }

    pub fn tile_request(&self) -> Result<TileRequest, String> {
        parse_request(&self.request)
    }
}

#[derive(Args, Debug, Clone)]
pub struct PutConfig {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Tile request path (/layer/z/x/y/filename).
    pub request: String,

    /// File to store. Reads stdin when omitted.
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

impl PutConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()?;
        self.tile_request().map(|_| ())
    }

    pub fn tile_request(&self) -> Result<TileRequest, String> {
        parse_request(&self.request)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Path template with {layer}, {x}, {y}, {z} and {filename} placeholders.
    #[arg(long)]
    pub template: String,

    /// Tile request path (/layer/z/x/y/filename).
    pub request: String,

    /// Print a JSON summary instead of the artifact bytes.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl ServeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.template.is_empty() {
            return Err("--template must not be empty".to_string());
        }
        self.tile_request().map(|_| ())
    }

    pub fn tile_request(&self) -> Result<TileRequest, String> {
        parse_request(&self.request)
    }
}

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Tile request path (/layer/z/x/y/filename).
    pub request: String,
}

impl CheckConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()?;
        self.tile_request().map(|_| ())
    }

    pub fn tile_request(&self) -> Result<TileRequest, String> {
        parse_request(&self.request)
    }
}

// =============================================================================
// Tests
// =============================================================================
