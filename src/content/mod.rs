//! Read-only queries over the news and events corpus.
//!
//! The gateway only ever talks to [`ContentQuery`]; [`store::ContentStore`]
//! is the in-process implementation, and tests may substitute their own.

pub mod snapshot;
pub mod store;

use crate::error::ContentError;
use crate::models::{Event, NewsArticle};
use async_trait::async_trait;

/// Narrowing applied to the upcoming-events listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub featured_only: bool,
    /// Category id or name, case-insensitive.
    pub category: Option<String>,
}

#[async_trait]
pub trait ContentQuery: Send + Sync {
    /// Every article, newest first.
    async fn all_articles(&self) -> Result<Vec<NewsArticle>, ContentError>;

    async fn featured_articles(&self) -> Result<Vec<NewsArticle>, ContentError>;

    async fn articles_by_category(&self, category: &str) -> Result<Vec<NewsArticle>, ContentError>;

    async fn articles_by_tag(&self, tag: &str) -> Result<Vec<NewsArticle>, ContentError>;

    async fn article_by_slug(&self, slug: &str) -> Result<Option<NewsArticle>, ContentError>;

    /// Distinct category names, alphabetical.
    async fn all_categories(&self) -> Result<Vec<String>, ContentError>;

    /// Distinct tag names, alphabetical.
    async fn all_tags(&self) -> Result<Vec<String>, ContentError>;

    /// Published events that have not yet ended, soonest first.
    async fn upcoming_events(&self, filter: &EventFilter) -> Result<Vec<Event>, ContentError>;

    /// A published event by slug. Drafts and cancelled events are invisible.
    async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, ContentError>;
}
