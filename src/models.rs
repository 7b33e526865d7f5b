//! Data models for the portal's content corpus.
//!
//! This module defines the records the API serves and the scraper produces:
//! - [`NewsArticle`]: an article ingested from a configured source
//! - [`Event`]: a calendar entry authored in the external CMS (read-only here)
//! - [`ScrapedItem`]: a raw listing entry before it becomes an article
//!
//! JSON field names are camelCase to match what the portal frontend consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news article as stored in the corpus and returned by `/api/news`.
///
/// Articles are keyed by `slug`. The scraper derives the slug from the title,
/// so re-scraping an unchanged listing overwrites the same entries; a
/// headline already held by another source's article gets a suffixed slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    /// Stable identifier, `{source}:{slug}`.
    pub id: String,
    /// Unique, URL-safe identifier used in `/api/news/{slug}`.
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Link to the article at its origin.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Id of the scraper source that produced this article.
    pub source: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

impl NewsArticle {
    /// The timestamp listings sort by: publication time when the source
    /// reported one, otherwise the time it was scraped.
    pub fn sort_time(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.scraped_at)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.to_lowercase() == category.to_lowercase())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags
            .iter()
            .any(|t| t.to_lowercase() == tag.to_lowercase())
    }
}

/// Publication state of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
}

/// An event as authored in the content-management system.
///
/// # Invariants
///
/// - `slug` is unique and stable across edits.
/// - `location.coordinates`, when present, is ordered (longitude, latitude).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub start_at: DateTime<Utc>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    pub status: EventStatus,
    #[serde(default)]
    pub category: Option<EventCategory>,
    #[serde(default)]
    pub location: Option<EventLocation>,
    #[serde(default)]
    pub organizer: Option<Organizer>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub ticket_url: Option<String>,
}

impl Event {
    /// Whether the event is still worth listing at `now`.
    ///
    /// Events without an end time are treated as ending when they start.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.end_at.unwrap_or(self.start_at) >= now
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.category.as_ref().is_some_and(|c| {
            c.id.eq_ignore_ascii_case(category) || c.name.to_lowercase() == category.to_lowercase()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLocation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// A geographic point serialized as `[longitude, latitude]`, the order map
/// libraries expect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates(pub f64, pub f64);

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self(longitude, latitude)
    }

    pub fn longitude(&self) -> f64 {
        self.0
    }

    pub fn latitude(&self) -> f64 {
        self.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organizer {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// One entry pulled off a source listing, before slugging and tagging.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedItem {
    pub title: String,
    /// Absolute URL of the entry.
    pub link: String,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Extra tags reported by the source itself (RSS `<category>`).
    pub tags: Vec<String>,
}
