use super::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument};

#[derive(Debug, Default, Deserialize)]
pub struct ScrapeQuery {
    pub source: Option<String>,
}

/// `GET /api/scrape`.
///
/// Without `source`, starts a background pass over every source and
/// acknowledges immediately. With `source`, looks it up by id or name
/// (case-insensitive) and scrapes it before answering.
#[instrument(level = "info", skip(state))]
pub async fn trigger_scrape(
    State(state): State<AppState>,
    Query(query): Query<ScrapeQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(wanted) = query.source.as_deref() else {
        return match state.scraper.start_scrapers().await {
            Ok(()) => {
                info!("Started scraping all sources");
                Ok(Json(json!({ "message": "Started scraping all sources" })))
            }
            Err(e) => {
                error!(error = %e, "Failed to start scrapers");
                Err(ApiError::Upstream("Failed to start scrapers"))
            }
        };
    };

    let Some((source_id, config)) = state.scraper.scraper_configs().lookup(wanted) else {
        return Err(ApiError::NotFound("Source not found"));
    };

    match state.scraper.scrape_source(config, source_id).await {
        Ok(report) => Ok(Json(json!({
            "message": format!("Successfully scraped source: {}", report.source_name),
            "source": report.source_name,
        }))),
        Err(e) => {
            error!(source_id, error = %e, "Failed to scrape source");
            Err(ApiError::Upstream("Failed to scrape source"))
        }
    }
}

/// `GET /api/scrape/sources`: the registry, in id order.
pub async fn list_sources(State(state): State<AppState>) -> Json<Value> {
    let sources: Vec<Value> = state
        .scraper
        .scraper_configs()
        .iter()
        .map(|(id, config)| {
            json!({
                "id": id,
                "sourceName": config.source_name,
                "url": config.url,
            })
        })
        .collect();
    Json(json!({ "sources": sources }))
}

#[cfg(test)]
mod tests {
    use crate::gateway::testing::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_scrape_all() {
        let scraper = Arc::new(RecordingScraper::with_sources());
        let (status, body) = get_json(app(scraper.clone()), "/api/scrape").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Started scraping all sources" }));
        assert_eq!(*scraper.starts.lock().unwrap(), 1);
        assert!(scraper.scraped.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scrape_one_source_by_id() {
        let scraper = Arc::new(RecordingScraper::with_sources());
        let (status, body) = get_json(app(scraper.clone()), "/api/scrape?source=city-hall").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "Successfully scraped source: City Hall",
                "source": "City Hall",
            })
        );
        assert_eq!(*scraper.scraped.lock().unwrap(), ["city-hall"]);
        assert_eq!(*scraper.starts.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scrape_source_lookup_ignores_case() {
        let scraper = Arc::new(RecordingScraper::with_sources());
        let (status, body) =
            get_json(app(scraper.clone()), "/api/scrape?source=HARBOUR%20authority").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "Harbour Authority");

        let (status, _) = get_json(app(scraper.clone()), "/api/scrape?source=City-Hall").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(*scraper.scraped.lock().unwrap(), ["harbour", "city-hall"]);
    }

    #[tokio::test]
    async fn test_unknown_source_is_404() {
        let scraper = Arc::new(RecordingScraper::with_sources());
        let (status, body) = get_json(app(scraper.clone()), "/api/scrape?source=UNKNOWN").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Source not found" }));
        assert!(scraper.scraped.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scrape_failures_are_generic_500() {
        let scraper = Arc::new(RecordingScraper {
            fail: true,
            ..RecordingScraper::with_sources()
        });

        let (status, body) = get_json(app(scraper.clone()), "/api/scrape?source=harbour").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to scrape source" }));

        let (status, body) = get_json(app(scraper), "/api/scrape").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to start scrapers" }));
    }

    #[tokio::test]
    async fn test_list_sources() {
        let (status, body) = get_json(app(Arc::new(RecordingScraper::with_sources())), "/api/scrape/sources").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sources"][0]["id"], "city-hall");
        assert_eq!(body["sources"][1]["sourceName"], "Harbour Authority");
    }
}
