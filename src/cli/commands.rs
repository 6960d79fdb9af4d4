//! Command handlers for the CLI
//!
//! Each handler builds what it needs from the loaded [`AppConfig`], runs, and
//! shuts the cache down so queued cleanups finish before the process exits.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::app::cache::stats::format_bytes;
use crate::app::{CacheStats, DownloadService, FetchingCache, ManifestBuilder, SchemeResourceLoader};
use crate::cli::{CacheAction, CacheArgs, DownloadArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Handle the download command
///
/// Stages every source into the destination directory through the cache.
pub async fn handle_download(args: DownloadArgs, config: &AppConfig) -> Result<()> {
    let start_time = Instant::now();
    info!(
        "Downloading {} resources into {}",
        args.sources.len(),
        args.destination_dir.display()
    );

    let manifest =
        ManifestBuilder::from_sources_into_directory(args.sources, &args.destination_dir)?
            .build()?;

    let service = DownloadService::new(open_cache(config).await?);
    let result = service.download(&manifest).await;
    service.shutdown().await;
    result?;

    println!(
        "✅ Downloaded {} files to {} in {:.2?}",
        manifest.len(),
        args.destination_dir.display(),
        start_time.elapsed()
    );
    Ok(())
}

/// Handle cache management commands
pub async fn handle_cache(args: CacheArgs, config: &AppConfig) -> Result<()> {
    let cache = open_cache(config).await?;

    let result = match args.action {
        CacheAction::Info { json } => handle_cache_info(&cache, json).await,
        CacheAction::Prune => handle_cache_prune(&cache).await,
    };

    cache.shutdown().await;
    result
}

/// Handle cache info display
async fn handle_cache_info(cache: &FetchingCache, json: bool) -> Result<()> {
    let stats = cache.stats().await;

    if json {
        let output = serde_json::to_string_pretty(&stats)
            .map_err(|e| AppError::generic(format!("Failed to serialize cache info: {}", e)))?;
        println!("{}", output);
        return Ok(());
    }

    print_cache_info(&stats);
    Ok(())
}

fn print_cache_info(stats: &CacheStats) {
    println!("💾 Cache Information");
    println!("===================");
    println!("Location: {}", stats.cache_root.display());
    println!("Resources: {}", stats.resource_count());
    println!("Versions: {}", stats.version_count());
    if stats.partial_count() > 0 {
        println!("Unfinished downloads: {}", stats.partial_count());
    }
    println!("Cache size: {}", stats.format_total_size());

    for entry in &stats.entries {
        println!();
        println!("{} ({})", entry.key, format_bytes(entry.size()));
        for version in &entry.versions {
            let state = match (version.committed, version.partial) {
                (true, _) => "committed",
                (false, true) => "partial",
                (false, false) => "empty",
            };
            println!(
                "  {:>15}  {:<9}  {}",
                version.version.to_string(),
                state,
                format_bytes(version.size)
            );
        }
    }
}

/// Handle cache pruning
async fn handle_cache_prune(cache: &FetchingCache) -> Result<()> {
    println!("🧹 Cache Cleanup");
    println!("===============");

    let report = cache.prune().await;

    println!("Removed versions: {}", report.removed);
    if report.failed > 0 {
        println!("⚠️  Versions that could not be removed: {}", report.failed);
    }
    Ok(())
}

async fn open_cache(config: &AppConfig) -> Result<FetchingCache> {
    let loader = SchemeResourceLoader::new(&config.http.to_runtime_config())?;
    let cache_config = config.cache.to_runtime_config();
    debug!("Cache configuration: {:?}", cache_config);

    Ok(FetchingCache::new(cache_config, Arc::new(loader)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use url::Url;

    fn config_for(temp_dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.cache.cache_root = Some(temp_dir.path().join("cache"));
        config
    }

    #[tokio::test]
    async fn test_download_local_files() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("setup.sh");
        std::fs::write(&source, b"#!/bin/sh\n").unwrap();
        let destination = temp_dir.path().join("job");
        std::fs::create_dir(&destination).unwrap();

        let args = DownloadArgs {
            destination_dir: destination.clone(),
            sources: vec![Url::from_file_path(&source).unwrap()],
        };
        handle_download(args, &config_for(&temp_dir)).await.unwrap();

        assert_eq!(
            std::fs::read(destination.join("setup.sh")).unwrap(),
            b"#!/bin/sh\n"
        );
    }

    #[tokio::test]
    async fn test_download_into_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("setup.sh");
        std::fs::write(&source, b"").unwrap();

        let args = DownloadArgs {
            destination_dir: temp_dir.path().join("missing"),
            sources: vec![Url::from_file_path(&source).unwrap()],
        };
        let result = handle_download(args, &config_for(&temp_dir)).await;
        assert!(matches!(result, Err(AppError::Download(_))));
    }

    #[tokio::test]
    async fn test_cache_commands() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_for(&temp_dir);

        for action in [
            CacheAction::Info { json: false },
            CacheAction::Info { json: true },
            CacheAction::Prune,
        ] {
            handle_cache(CacheArgs { action }, &config).await.unwrap();
        }
    }
}
