//! dman command-line entry point.

use clap::Parser;
use tracing::debug;

use dman::config::{Cli, Config};
use dman::locale::detect_language;
use dman::render::render;
use dman::{DiskCache, HttpFetcher, Key, Resolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging. Logs go to stderr; stdout carries the page.
    let filter = if cli.verbose { "dman=debug" } else { "dman=warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(cli.verbose)
        .init();

    // Load configuration.
    let config = Config::load(cli.config.as_deref())?;

    let lang = cli.lang.clone().unwrap_or_else(detect_language);
    let key = Key::new(cli.page.as_str(), cli.release.as_str(), lang);
    debug!(key = %key, ttl_secs = config.cache.ttl().as_secs(), "Resolving page");

    let cache = DiskCache::new(config.cache.root.clone());
    let fetcher = HttpFetcher::new(&config.fetch)?;
    let resolver = Resolver::new(cache, fetcher, config.cache.ttl());

    let resolved = if cli.refresh {
        resolver.refresh(&key).await
    } else {
        resolver.get(&key).await
    };

    let mut document = match resolved {
        Ok(document) => document,
        Err(err) if err.is_not_found() => anyhow::bail!("man page not found: {}", key.page),
        Err(err) => return Err(err.into()),
    };
    debug!(key = %key, origin = ?document.origin, "Resolved page");

    render(&mut document.file, &config.render).await?;

    Ok(())
}
