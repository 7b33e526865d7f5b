//! # Regional Portal server
//!
//! Loads settings, opens the content store, wires the scraper service and
//! serves the JSON API until Ctrl-C or SIGTERM.
//!
//! ## Usage
//!
//! ```sh
//! regional_portal --config config/portal.yaml --port 8080
//! ```

use anyhow::Context;
use clap::Parser;
use regional_portal::cli::ServeCli;
use regional_portal::config::{RuntimeEnv, Settings};
use regional_portal::content::store::ContentStore;
use regional_portal::gateway::{self, AppState};
use regional_portal::lifecycle::ShutdownHook;
use regional_portal::scrapers::fetch::{HttpFetcher, RetryFetch};
use regional_portal::scrapers::{ScrapeOrchestrator, ScraperService};
use regional_portal::utils::ensure_writable_dir;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[tokio::main]
#[instrument]
async fn main() -> anyhow::Result<()> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = ServeCli::parse();

    let mut settings = Settings::load(&args.config)?;
    if let Some(env) = args.environment.as_deref() {
        settings.environment = env.parse::<RuntimeEnv>()?;
    }
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    info!(environment = ?settings.environment, "Runtime environment");

    // ---- Content store ----
    let store = match settings.content.snapshot_dir.clone() {
        Some(dir) => {
            if let Err(e) = ensure_writable_dir(&dir).await {
                error!(
                    path = %dir.display(),
                    error = %e,
                    "Snapshot directory is not writable (fix perms or choose a different path)"
                );
                anyhow::bail!("snapshot directory {} is not writable: {e}", dir.display());
            }
            ContentStore::open(dir).await?
        }
        None => {
            info!("No snapshot_dir configured; content lives in memory only");
            ContentStore::default()
        }
    };
    let store = Arc::new(store);
    info!(articles = store.article_count().await, "Content store ready");

    // ---- Scraper ----
    let fetcher = HttpFetcher::new(settings.scraper.request_timeout())
        .context("failed to build HTTP client")?;
    let fetcher = RetryFetch::new(fetcher, settings.scraper.max_retries, RETRY_BASE_DELAY);
    let scraper = Arc::new(ScraperService::new(
        settings.scraper.sources.clone(),
        Arc::new(fetcher),
        Arc::clone(&store),
        settings.scraper.concurrency,
        settings.scraper.interval(),
    ));
    let orchestrator: Arc<dyn ScrapeOrchestrator> = scraper;

    if args.scrape_on_start {
        if let Err(e) = orchestrator.start_scrapers().await {
            error!(error = %e, "Failed to start scrapers on startup");
        }
    }

    // ---- Serve ----
    let hook = Arc::new(ShutdownHook::register(
        settings.environment,
        Arc::clone(&orchestrator),
    ));
    let app = gateway::routes(AppState::new(store, Arc::clone(&orchestrator)));

    let addr = settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(Arc::clone(&hook).wait_for_signal())
        .await
        .context("server error")?;

    // No-op when a signal already ran the hook.
    hook.fire();

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Server stopped");
    Ok(())
}
