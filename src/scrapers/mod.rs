//! Source scraping and the background scrape lifecycle.
//!
//! Each configured source is ingested the same way:
//!
//! 1. **Fetching**: download the listing page or feed ([`fetch`])
//! 2. **Parsing**: turn it into [`ScrapedItem`]s ([`html`] or [`rss`])
//! 3. **Storing**: slug, tag and upsert the articles into the content store
//!
//! [`ScraperService`] runs single sources on request and full passes over
//! every source in a background task that [`ScrapeOrchestrator::stop_scrapers`]
//! can cancel at any point.
//!
//! # Source kinds
//!
//! | Kind | Module | Notes |
//! |------|--------|-------|
//! | HTML listing | [`html`] | CSS selectors per source |
//! | RSS 2.0 | [`rss`] | `<category>` elements become tags |

pub mod fetch;
pub mod html;
pub mod registry;
pub mod rss;

use crate::content::store::ContentStore;
use crate::error::ScrapeError;
use crate::models::{NewsArticle, ScrapedItem};
use crate::utils::slugify;
use async_trait::async_trait;
use chrono::Utc;
use fetch::PageFetch;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use itertools::Itertools;
use registry::{SourceConfig, SourceKind, SourceRegistry};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of ingesting one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeReport {
    pub source_id: String,
    pub source_name: String,
    /// Entries the listing yielded, before de-duplication.
    pub found: usize,
    /// Articles written to the store.
    pub stored: usize,
    /// Of `stored`, how many were not in the store before.
    pub inserted: usize,
}

/// Outcome of a pass over every source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub stored: usize,
}

/// What the gateway needs from a scraper.
#[async_trait]
pub trait ScrapeOrchestrator: Send + Sync {
    /// Every registered source.
    fn scraper_configs(&self) -> &SourceRegistry;

    /// Ingest exactly one source. Safe to repeat.
    async fn scrape_source(
        &self,
        config: &SourceConfig,
        source_id: &str,
    ) -> Result<ScrapeReport, ScrapeError>;

    /// Kick off a pass over every source in the background and return.
    ///
    /// If the background task is already alive it is woken for an
    /// immediate extra pass instead of starting a second one.
    async fn start_scrapers(&self) -> Result<(), ScrapeError>;

    /// Cancel background scraping. Non-blocking and idempotent.
    fn stop_scrapers(&self);

    fn is_running(&self) -> bool;
}

/// Shared with the background task.
#[derive(Debug)]
struct Engine {
    registry: SourceRegistry,
    fetcher: Arc<dyn PageFetch>,
    store: Arc<ContentStore>,
    concurrency: usize,
}

#[derive(Debug)]
struct Background {
    cancel: CancellationToken,
    wake: Arc<Notify>,
    handle: JoinHandle<()>,
}

/// The production [`ScrapeOrchestrator`].
#[derive(Debug)]
pub struct ScraperService {
    engine: Arc<Engine>,
    interval: Option<Duration>,
    background: Arc<Mutex<Option<Background>>>,
}

impl ScraperService {
    /// # Arguments
    ///
    /// * `registry` - Sources to scrape
    /// * `fetcher` - How pages are downloaded (wrap in [`fetch::RetryFetch`] for production)
    /// * `store` - Where articles land
    /// * `concurrency` - Sources scraped at once during a pass (at least 1)
    /// * `interval` - Pause between background passes; `None` for one pass per start
    pub fn new(
        registry: SourceRegistry,
        fetcher: Arc<dyn PageFetch>,
        store: Arc<ContentStore>,
        concurrency: usize,
        interval: Option<Duration>,
    ) -> Self {
        Self {
            engine: Arc::new(Engine {
                registry,
                fetcher,
                store,
                concurrency: concurrency.max(1),
            }),
            interval,
            background: Arc::new(Mutex::new(None)),
        }
    }

    /// Run one pass over every source in the foreground.
    pub async fn scrape_all(&self) -> Result<PassSummary, ScrapeError> {
        self.engine.scrape_all().await
    }

    fn lock_background(&self) -> MutexGuard<'_, Option<Background>> {
        lock_slot(&self.background)
    }
}

// A panic while holding this lock leaves only plain data behind.
fn lock_slot(slot: &Mutex<Option<Background>>) -> MutexGuard<'_, Option<Background>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Engine {
    #[instrument(level = "info", skip(self, config), fields(source = %config.source_name))]
    async fn scrape_source(
        &self,
        config: &SourceConfig,
        source_id: &str,
    ) -> Result<ScrapeReport, ScrapeError> {
        let body = self.fetcher.fetch(&config.url).await?;
        let items = match &config.kind {
            SourceKind::Html(selectors) => html::parse_listing(&body, &config.url, selectors)?,
            SourceKind::Rss => rss::parse_feed(&body, &config.url)?,
        };
        let found = items.len();

        let articles = to_articles(items, config, source_id);
        let stored = articles.len();
        let inserted = if articles.is_empty() {
            warn!("Source produced no articles");
            0
        } else {
            self.store.upsert_articles(articles).await?
        };

        info!(found, stored, inserted, "Scraped source");
        Ok(ScrapeReport {
            source_id: source_id.to_string(),
            source_name: config.source_name.clone(),
            found,
            stored,
            inserted,
        })
    }

    #[instrument(level = "info", skip(self), fields(sources = self.registry.len()))]
    async fn scrape_all(&self) -> Result<PassSummary, ScrapeError> {
        if self.registry.is_empty() {
            return Err(ScrapeError::NoSources);
        }

        let sources: Vec<(String, SourceConfig)> = self
            .registry
            .iter()
            .map(|(id, config)| (id.clone(), config.clone()))
            .collect();

        let results: Vec<Result<ScrapeReport, ScrapeError>> = stream::iter(sources)
            .map(|(id, config)| async move {
                let result = self.scrape_source(&config, &id).await;
                if let Err(e) = &result {
                    error!(source_id = %id, error = %e, "Source failed");
                }
                result
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = PassSummary::default();
        for result in results {
            match result {
                Ok(report) => {
                    summary.succeeded += 1;
                    summary.stored += report.stored;
                }
                Err(_) => summary.failed += 1,
            }
        }
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            stored = summary.stored,
            "Completed scrape pass"
        );

        if summary.succeeded == 0 {
            return Err(ScrapeError::AllSourcesFailed(summary.failed));
        }
        Ok(summary)
    }
}

/// Background loop: a pass, then wait for the interval, a wake-up or
/// cancellation. Without an interval it exits after the pass unless a
/// wake-up arrived meanwhile.
///
/// The exit decision is taken under the `slot` lock and clears the slot, so
/// a concurrent `start_scrapers` either wakes this task before it decides or
/// finds the slot empty and spawns a new one.
async fn run_passes(
    engine: Arc<Engine>,
    cancel: CancellationToken,
    wake: Arc<Notify>,
    interval: Option<Duration>,
    slot: Arc<Mutex<Option<Background>>>,
) {
    info!(?interval, "Background scraping started");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = engine.scrape_all() => {
                if let Err(e) = result {
                    error!(error = %e, "Scrape pass failed");
                }
            }
        }

        match interval {
            Some(every) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = wake.notified() => debug!("Woken for an extra pass"),
                    _ = tokio::time::sleep(every) => {}
                }
            }
            None => {
                let mut background = lock_slot(&slot);
                if wake.notified().now_or_never().is_none() {
                    if background
                        .as_ref()
                        .is_some_and(|b| Arc::ptr_eq(&b.wake, &wake))
                    {
                        *background = None;
                    }
                    break;
                }
                debug!("Woken for an extra pass");
            }
        }
    }
    info!("Background scraping stopped");
}

#[async_trait]
impl ScrapeOrchestrator for ScraperService {
    fn scraper_configs(&self) -> &SourceRegistry {
        &self.engine.registry
    }

    async fn scrape_source(
        &self,
        config: &SourceConfig,
        source_id: &str,
    ) -> Result<ScrapeReport, ScrapeError> {
        self.engine.scrape_source(config, source_id).await
    }

    async fn start_scrapers(&self) -> Result<(), ScrapeError> {
        if self.engine.registry.is_empty() {
            return Err(ScrapeError::NoSources);
        }

        let mut background = self.lock_background();
        if let Some(running) = background.as_ref().filter(|b| !b.handle.is_finished()) {
            info!("Background scraping already running; requesting another pass");
            running.wake.notify_one();
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let wake = Arc::new(Notify::new());
        let handle = tokio::spawn(run_passes(
            Arc::clone(&self.engine),
            cancel.clone(),
            Arc::clone(&wake),
            self.interval,
            Arc::clone(&self.background),
        ));
        *background = Some(Background {
            cancel,
            wake,
            handle,
        });
        Ok(())
    }

    fn stop_scrapers(&self) {
        match self.lock_background().take() {
            Some(background) => {
                background.cancel.cancel();
                info!("Stop requested for background scraping");
            }
            None => debug!("Stop requested but nothing is running"),
        }
    }

    fn is_running(&self) -> bool {
        self.lock_background()
            .as_ref()
            .is_some_and(|b| !b.handle.is_finished())
    }
}

/// Turn listing entries into articles for `source_id`.
///
/// Entries whose title slugifies to nothing are dropped; duplicates within
/// the listing keep their first occurrence.
fn to_articles(items: Vec<ScrapedItem>, config: &SourceConfig, source_id: &str) -> Vec<NewsArticle> {
    let scraped_at = Utc::now();
    items
        .into_iter()
        .filter_map(|item| {
            let slug = slugify(&item.title);
            if slug.is_empty() {
                return None;
            }
            let tags = config
                .tags
                .iter()
                .chain(item.tags.iter())
                .unique_by(|t| t.to_lowercase())
                .cloned()
                .collect();
            Some(NewsArticle {
                id: format!("{source_id}:{slug}"),
                slug,
                title: item.title,
                summary: item.summary,
                content: None,
                url: item.link,
                image_url: item.image_url,
                source: source_id.to_string(),
                published_at: item.published_at,
                scraped_at,
                categories: config.categories.clone(),
                tags,
                featured: config.featured,
            })
        })
        .unique_by(|article| article.slug.clone())
        .collect()
}
