//! tile-fs-cache - inspect and populate a filesystem tile cache.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use clap::Parser;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tile_fs_cache::{
    config::{CheckConfig, Cli, Command, GetConfig, PutConfig, ServeConfig},
    freshness::{artifact_age, AgeKind},
    StaticProvider, TileCache,
};

/// Exit code for a cache miss on `get`.
const EXIT_MISS: u8 = 2;

/// The binary has no host context of its own.
type Host = ();

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Get(config) => run_get(config).await,
        Command::Put(config) => run_put(config).await,
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tile_fs_cache=debug"
    } else {
        "tile_fs_cache=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Summary printed by `--json`.
#[derive(Debug, Serialize)]
struct ArtifactSummary {
    path: String,
    hit: bool,
    content_type: Option<String>,
    size: Option<usize>,
    refresh: Option<bool>,
}

fn content_type_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn write_stdout(content: &[u8]) -> Result<(), std::io::Error> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(content).await?;
    stdout.flush().await
}

fn print_json(summary: &ArtifactSummary) -> ExitCode {
    match serde_json::to_string_pretty(summary) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to encode summary: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build and initialize a cache, reporting configuration errors.
async fn open_cache(config: &tile_fs_cache::config::CacheArgs) -> Option<TileCache<Host>> {
    let cache = match TileCache::new(config.to_options()) {
        Ok(cache) => cache,
        Err(e) => {
            error!("Configuration error: {}", e);
            return None;
        }
    };
    if let Err(e) = cache.initialize(Arc::new(())).await {
        error!("Failed to initialize cache: {}", e);
        return None;
    }
    debug!("Cache ready: {:?}", cache);
    Some(cache)
}

// =============================================================================
// Get Command
// =============================================================================

async fn run_get(config: GetConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let Ok(request) = config.tile_request() else {
        return ExitCode::FAILURE;
    };
    let Some(cache) = open_cache(&config.cache).await else {
        return ExitCode::FAILURE;
    };

    let path = cache.resolve_path(&request);
    let artifact = match cache.get(&(), &request).await {
        Ok(artifact) => artifact,
        Err(e) => {
            error!("Cache read failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        let summary = ArtifactSummary {
            path: path.display().to_string(),
            hit: artifact.is_some(),
            content_type: artifact.as_ref().and_then(|a| content_type_of(&a.headers)),
            size: artifact.as_ref().map(|a| a.content.len()),
            refresh: artifact.as_ref().map(|a| a.refresh),
        };
        let code = print_json(&summary);
        return if artifact.is_some() {
            code
        } else {
            ExitCode::from(EXIT_MISS)
        };
    }

    let Some(artifact) = artifact else {
        info!("Cache miss: {}", path.display());
        return ExitCode::from(EXIT_MISS);
    };
    if artifact.refresh {
        info!("Artifact is due for refresh: {}", path.display());
    }
    if let Err(e) = write_stdout(&artifact.content).await {
        error!("Failed to write output: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Put Command
// =============================================================================

async fn run_put(config: PutConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let Ok(request) = config.tile_request() else {
        return ExitCode::FAILURE;
    };
    let Some(cache) = open_cache(&config.cache).await else {
        return ExitCode::FAILURE;
    };

    let content = match config.input {
        Some(ref input) => tokio::fs::read(input).await,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin().read_to_end(&mut buf).await.map(|_| buf)
        }
    };
    let content = match content {
        Ok(content) => Bytes::from(content),
        Err(e) => {
            error!("Failed to read input: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let size = content.len();
    if let Err(e) = cache.set(&(), &request, content, &HeaderMap::new()).await {
        error!("Cache write failed: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        "Stored {} bytes at {}",
        size,
        cache.resolve_path(&request).display()
    );
    ExitCode::SUCCESS
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let Ok(request) = config.tile_request() else {
        return ExitCode::FAILURE;
    };

    let provider = StaticProvider::new(config.template.as_str());
    let path = provider.resolve_path(&request);

    let artifact = match provider.serve(&request).await {
        Ok(artifact) => artifact,
        Err(e) => {
            error!("{} ({}): {}", e, e.status_code(), path.display());
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        return print_json(&ArtifactSummary {
            path: path.display().to_string(),
            hit: true,
            content_type: content_type_of(&artifact.headers),
            size: Some(artifact.content.len()),
            refresh: None,
        });
    }

    if let Err(e) = write_stdout(&artifact.content).await {
        error!("Failed to write output: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }
    let Ok(request) = config.tile_request() else {
        return ExitCode::FAILURE;
    };
    let cache: TileCache<Host> = match TileCache::new(config.cache.to_options()) {
        Ok(cache) => cache,
        Err(e) => {
            println!("✗ Configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let path = cache.resolve_path(&request);
    println!("Path: {}", path.display());

    let freshness = cache.freshness();
    let max_age = freshness.age_tolerance(AgeKind::MaxAge, &(), &request);
    if max_age == Some(std::time::Duration::ZERO) {
        println!("✓ max_age is 0: cache disabled for this request");
        return ExitCode::SUCCESS;
    }

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("✗ not stored");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            println!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mtime = match metadata.modified() {
        Ok(mtime) => mtime,
        Err(e) => {
            println!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let now = SystemTime::now();
    let verdict = freshness.verdict_at(now, mtime, max_age, &(), &request);

    println!("Size: {} bytes", metadata.len());
    println!("Age: {}s", artifact_age(now, mtime).as_secs());
    println!("Serve: {}", if verdict.serve { "✓ yes" } else { "✗ stale" });
    println!("Refresh: {}", if verdict.refresh { "yes" } else { "no" });

    ExitCode::SUCCESS
}
