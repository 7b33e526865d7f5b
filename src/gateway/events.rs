use super::{flag_set, AppState, ListQuery};
use crate::content::EventFilter;
use crate::error::ApiError;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, instrument};

/// `GET /api/events`: upcoming published events, soonest first.
///
/// Unlike `/api/news`, `featured=true` and `category` combine.
#[instrument(level = "info", skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = EventFilter {
        featured_only: flag_set(query.featured.as_deref()),
        category: query.category,
    };
    match state.content.upcoming_events(&filter).await {
        Ok(events) => Ok(Json(json!({ "events": events }))),
        Err(e) => {
            error!(error = %e, "Failed to fetch events");
            Err(ApiError::Upstream("Failed to fetch events"))
        }
    }
}

/// `GET /api/events/{slug}`.
#[instrument(level = "info", skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.content.event_by_slug(&slug).await {
        Ok(Some(event)) => Ok(Json(json!({ "event": event }))),
        Ok(None) => Err(ApiError::NotFound("Event not found")),
        Err(e) => {
            error!(error = %e, "Failed to fetch event");
            Err(ApiError::Upstream("Failed to fetch event"))
        }
    }
}
