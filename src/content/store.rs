//! In-memory corpus with optional JSON snapshot persistence.

use super::{snapshot, ContentQuery, EventFilter};
use crate::error::ContentError;
use crate::models::{Event, EventStatus, NewsArticle};
use crate::utils::slugify;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct Corpus {
    articles: BTreeMap<String, NewsArticle>,
    events: BTreeMap<String, Event>,
}

/// The portal's content store.
///
/// Reads take a shared lock. Writes come only from the scraper through
/// [`ContentStore::upsert_articles`]; events are loaded once and never
/// modified.
#[derive(Debug, Default)]
pub struct ContentStore {
    corpus: RwLock<Corpus>,
    snapshot_dir: Option<PathBuf>,
    /// Serializes snapshot writes so files land in upsert order.
    persist: Mutex<()>,
}

impl ContentStore {
    /// A store that never touches disk.
    pub fn in_memory(articles: Vec<NewsArticle>, events: Vec<Event>) -> Self {
        Self {
            corpus: RwLock::new(Corpus {
                articles: articles.into_iter().map(|a| (a.slug.clone(), a)).collect(),
                events: events.into_iter().map(|e| (e.slug.clone(), e)).collect(),
            }),
            snapshot_dir: None,
            persist: Mutex::new(()),
        }
    }

    /// Load the snapshot in `dir` and keep writing article updates back to it.
    #[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
    pub async fn open(dir: PathBuf) -> Result<Self, ContentError> {
        let (articles, events) = snapshot::load(&dir).await?;
        let mut store = Self::in_memory(articles, events);
        store.snapshot_dir = Some(dir);
        Ok(store)
    }

    /// Insert or replace articles by id, then persist the snapshot.
    ///
    /// Slugs stay unique across sources: an article whose slug already
    /// belongs to another id gets the source appended (see [`free_slug`]).
    /// Returns how many of the given articles were new to the corpus.
    #[instrument(level = "info", skip_all, fields(count = articles.len()))]
    pub async fn upsert_articles(&self, articles: Vec<NewsArticle>) -> Result<usize, ContentError> {
        let _persist = self.persist.lock().await;

        let (inserted, all) = {
            let mut corpus = self.corpus.write().await;
            let mut inserted = 0;
            for mut article in articles {
                let slug = free_slug(&corpus.articles, &article);
                if slug != article.slug {
                    debug!(id = %article.id, %slug, "Slug taken by another source");
                    article.slug = slug;
                }
                if corpus.articles.insert(article.slug.clone(), article).is_none() {
                    inserted += 1;
                }
            }
            let all = self
                .snapshot_dir
                .as_ref()
                .map(|_| corpus.articles.values().cloned().collect::<Vec<_>>());
            (inserted, all)
        };
        debug!(inserted, "Upserted articles");

        if let (Some(dir), Some(all)) = (&self.snapshot_dir, all) {
            snapshot::write_articles(&all, dir).await?;
        }
        Ok(inserted)
    }

    pub async fn article_count(&self) -> usize {
        self.corpus.read().await.articles.len()
    }

    /// Upcoming events relative to an explicit `now`.
    pub async fn upcoming_events_at(&self, filter: &EventFilter, now: DateTime<Utc>) -> Vec<Event> {
        let corpus = self.corpus.read().await;
        corpus
            .events
            .values()
            .filter(|e| e.status == EventStatus::Published && e.is_upcoming(now))
            .filter(|e| !filter.featured_only || e.is_featured)
            .filter(|e| filter.category.as_deref().is_none_or(|c| e.in_category(c)))
            .cloned()
            .sorted_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.slug.cmp(&b.slug)))
            .collect()
    }

    async fn articles_where<F>(&self, keep: F) -> Vec<NewsArticle>
    where
        F: Fn(&NewsArticle) -> bool,
    {
        let corpus = self.corpus.read().await;
        corpus
            .articles
            .values()
            .filter(|a| keep(a))
            .cloned()
            .sorted_by(|a, b| {
                b.sort_time()
                    .cmp(&a.sort_time())
                    .then_with(|| a.slug.cmp(&b.slug))
            })
            .collect()
    }

    async fn distinct_labels<F>(&self, labels: F) -> Vec<String>
    where
        F: Fn(&NewsArticle) -> &[String],
    {
        let corpus = self.corpus.read().await;
        corpus
            .articles
            .values()
            .flat_map(|a| labels(a).iter())
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
            .unique_by(|label| label.to_lowercase())
            .map(str::to_string)
            .sorted_by_key(|label| label.to_lowercase())
            .collect()
    }
}

/// The slug `article` should be stored under.
///
/// Its own slug if free or already held by the same id, otherwise
/// `{slug}-{source}`, then `{slug}-{source}-2`, `-3`, ... Deterministic, so
/// re-scraping an article lands on the slot it took the first time.
fn free_slug(articles: &BTreeMap<String, NewsArticle>, article: &NewsArticle) -> String {
    let available = |slug: &str| articles.get(slug).is_none_or(|held| held.id == article.id);
    if available(article.slug.as_str()) {
        return article.slug.clone();
    }
    let base = format!("{}-{}", article.slug, slugify(&article.source));
    if available(base.as_str()) {
        return base;
    }
    (2usize..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| available(candidate.as_str()))
        .unwrap_or(base)
}

#[async_trait]
impl ContentQuery for ContentStore {
    async fn all_articles(&self) -> Result<Vec<NewsArticle>, ContentError> {
        Ok(self.articles_where(|_| true).await)
    }

    async fn featured_articles(&self) -> Result<Vec<NewsArticle>, ContentError> {
        Ok(self.articles_where(|a| a.featured).await)
    }

    async fn articles_by_category(&self, category: &str) -> Result<Vec<NewsArticle>, ContentError> {
        Ok(self.articles_where(|a| a.has_category(category)).await)
    }

    async fn articles_by_tag(&self, tag: &str) -> Result<Vec<NewsArticle>, ContentError> {
        Ok(self.articles_where(|a| a.has_tag(tag)).await)
    }

    async fn article_by_slug(&self, slug: &str) -> Result<Option<NewsArticle>, ContentError> {
        Ok(self.corpus.read().await.articles.get(slug).cloned())
    }

    async fn all_categories(&self) -> Result<Vec<String>, ContentError> {
        Ok(self.distinct_labels(|a| a.categories.as_slice()).await)
    }

    async fn all_tags(&self) -> Result<Vec<String>, ContentError> {
        Ok(self.distinct_labels(|a| a.tags.as_slice()).await)
    }

    async fn upcoming_events(&self, filter: &EventFilter) -> Result<Vec<Event>, ContentError> {
        Ok(self.upcoming_events_at(filter, Utc::now()).await)
    }

    async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, ContentError> {
        let corpus = self.corpus.read().await;
        let event = corpus
            .events
            .get(slug)
            .filter(|e| e.status == EventStatus::Published)
            .cloned();
        if event.is_none() {
            debug!(slug, "Event not visible");
        }
        Ok(event)
    }
}
