use super::{flag_set, AppState, ListQuery};
use crate::error::ApiError;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, instrument};

/// `GET /api/news`.
///
/// Filters are exclusive, checked in order: `featured=true`, then
/// `category`, then `tag`; with none of them every article is returned.
#[instrument(level = "info", skip(state))]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let result = if flag_set(query.featured.as_deref()) {
        state.content.featured_articles().await
    } else if let Some(category) = query.category.as_deref() {
        state.content.articles_by_category(category).await
    } else if let Some(tag) = query.tag.as_deref() {
        state.content.articles_by_tag(tag).await
    } else {
        state.content.all_articles().await
    };

    match result {
        Ok(articles) => Ok(Json(json!({ "articles": articles }))),
        Err(e) => {
            error!(error = %e, "Failed to fetch articles");
            Err(ApiError::Upstream("Failed to fetch articles"))
        }
    }
}

/// `GET /api/news/{slug}`.
#[instrument(level = "info", skip(state))]
pub async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.content.article_by_slug(&slug).await {
        Ok(Some(article)) => Ok(Json(json!({ "article": article }))),
        Ok(None) => Err(ApiError::NotFound("Article not found")),
        Err(e) => {
            error!(error = %e, "Failed to fetch article");
            Err(ApiError::Upstream("Failed to fetch article"))
        }
    }
}

/// `GET /api/news/categories`.
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.content.all_categories().await {
        Ok(categories) => Ok(Json(json!({ "categories": categories }))),
        Err(e) => {
            error!(error = %e, "Failed to fetch categories");
            Err(ApiError::Upstream("Failed to fetch categories"))
        }
    }
}

/// `GET /api/news/tags`.
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.content.all_tags().await {
        Ok(tags) => Ok(Json(json!({ "tags": tags }))),
        Err(e) => {
            error!(error = %e, "Failed to fetch tags");
            Err(ApiError::Upstream("Failed to fetch tags"))
        }
    }
}
