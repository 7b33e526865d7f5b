//! HTTP API.
//!
//! Handlers are thin: parse the query, call one service operation, wrap the
//! result as `{ <resource>: ... }`. Unknown slugs and sources are 404s; any
//! other failure is logged in full and answered with a generic 500.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /api/news` | [`news::list_articles`] |
//! | `GET /api/news/categories` | [`news::list_categories`] |
//! | `GET /api/news/tags` | [`news::list_tags`] |
//! | `GET /api/news/{slug}` | [`news::get_article`] |
//! | `GET /api/events` | [`events::list_events`] |
//! | `GET /api/events/{slug}` | [`events::get_event`] |
//! | `GET /api/scrape` | [`scrape::trigger_scrape`] |
//! | `GET /api/scrape/sources` | [`scrape::list_sources`] |

pub mod events;
pub mod news;
pub mod scrape;

use crate::content::ContentQuery;
use crate::scrapers::ScrapeOrchestrator;
use axum::{routing::get, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<dyn ContentQuery>,
    pub scraper: Arc<dyn ScrapeOrchestrator>,
}

impl AppState {
    pub fn new(content: Arc<dyn ContentQuery>, scraper: Arc<dyn ScrapeOrchestrator>) -> Self {
        Self { content, scraper }
    }
}

/// Treats only the literal `true` (any case) as set, like the portal's
/// `?featured=true` links.
pub(crate) fn flag_set(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Query string of `/api/news` and `/api/events`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub featured: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/news", get(news::list_articles))
        .route("/api/news/categories", get(news::list_categories))
        .route("/api/news/tags", get(news::list_tags))
        .route("/api/news/{slug}", get(news::get_article))
        .route("/api/events", get(events::list_events))
        .route("/api/events/{slug}", get(events::get_event))
        .route("/api/scrape", get(scrape::trigger_scrape))
        .route("/api/scrape/sources", get(scrape::list_sources))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for the handler tests.

    use super::*;
    use crate::content::store::ContentStore;
    use crate::error::ScrapeError;
    use crate::models::{Event, EventCategory, EventStatus, NewsArticle};
    use crate::scrapers::registry::{SourceConfig, SourceKind, SourceRegistry};
    use crate::scrapers::ScrapeReport;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::Value;
    use std::sync::Mutex;
    use tower::util::ServiceExt;

    /// Records every call; fails on demand.
    #[derive(Debug, Default)]
    pub struct RecordingScraper {
        pub registry: SourceRegistry,
        pub scraped: Mutex<Vec<String>>,
        pub starts: Mutex<usize>,
        pub fail: bool,
    }

    impl RecordingScraper {
        pub fn with_sources() -> Self {
            let source = |name: &str| SourceConfig {
                source_name: name.to_string(),
                url: "https://example.org/feed.xml".to_string(),
                kind: SourceKind::Rss,
                categories: vec![],
                tags: vec![],
                featured: false,
            };
            Self {
                registry: [
                    ("city-hall".to_string(), source("City Hall")),
                    ("harbour".to_string(), source("Harbour Authority")),
                ]
                .into_iter()
                .collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ScrapeOrchestrator for RecordingScraper {
        fn scraper_configs(&self) -> &SourceRegistry {
            &self.registry
        }

        async fn scrape_source(
            &self,
            config: &SourceConfig,
            source_id: &str,
        ) -> Result<ScrapeReport, ScrapeError> {
            self.scraped.lock().unwrap().push(source_id.to_string());
            if self.fail {
                return Err(ScrapeError::Feed("boom".to_string()));
            }
            Ok(ScrapeReport {
                source_id: source_id.to_string(),
                source_name: config.source_name.clone(),
                found: 1,
                stored: 1,
                inserted: 1,
            })
        }

        async fn start_scrapers(&self) -> Result<(), ScrapeError> {
            *self.starts.lock().unwrap() += 1;
            if self.fail {
                return Err(ScrapeError::NoSources);
            }
            Ok(())
        }

        fn stop_scrapers(&self) {}

        fn is_running(&self) -> bool {
            false
        }
    }

    fn article(slug: &str, hours_ago: i64, category: &str, tags: &[&str], featured: bool) -> NewsArticle {
        let at = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap() - Duration::hours(hours_ago);
        NewsArticle {
            id: format!("city-hall:{slug}"),
            slug: slug.to_string(),
            title: slug.replace('-', " "),
            summary: None,
            content: None,
            url: format!("https://example.org/{slug}"),
            image_url: None,
            source: "city-hall".to_string(),
            published_at: Some(at),
            scraped_at: at,
            categories: vec![category.to_string()],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            featured,
        }
    }

    fn event(slug: &str, days_ahead: i64, status: EventStatus, featured: bool) -> Event {
        let start = Utc::now() + Duration::days(days_ahead);
        Event {
            id: format!("evt-{slug}"),
            slug: slug.to_string(),
            title: slug.to_string(),
            description: String::new(),
            start_at: start,
            end_at: Some(start + Duration::hours(3)),
            status,
            category: Some(EventCategory {
                id: "cat-music".to_string(),
                name: "Music".to_string(),
            }),
            location: None,
            organizer: None,
            featured_image: None,
            is_featured: featured,
            is_free: false,
            ticket_url: None,
        }
    }

    pub fn content() -> Arc<ContentStore> {
        Arc::new(ContentStore::in_memory(
            vec![
                article("budget-approved", 1, "Politics", &["budget"], true),
                article("ferry-timetable", 2, "Transport", &["ferry", "budget"], false),
                article("jazz-weekend", 3, "Culture", &["music"], true),
            ],
            vec![
                event("harbour-concert", 3, EventStatus::Published, true),
                event("market-day", 1, EventStatus::Published, false),
                event("draft-gala", 2, EventStatus::Draft, false),
            ],
        ))
    }

    pub fn app(scraper: Arc<RecordingScraper>) -> Router {
        routes(AppState::new(content(), scraper))
    }

    pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}
