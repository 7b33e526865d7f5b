//! JSON snapshot persistence for the corpus.
//!
//! # Layout
//!
//! ```text
//! snapshot_dir/
//! ├── articles.json   # rewritten after every successful scrape
//! └── events.json     # exported by the CMS, only ever read
//! ```
//!
//! Articles are written to a temporary file first and renamed over the old
//! snapshot, so a crash mid-write never leaves a truncated `articles.json`.

use crate::error::ContentError;
use crate::models::{Event, NewsArticle};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

pub const ARTICLES_FILE: &str = "articles.json";
pub const EVENTS_FILE: &str = "events.json";

/// Read both collections from `dir`. Missing files count as empty.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn load(dir: &Path) -> Result<(Vec<NewsArticle>, Vec<Event>), ContentError> {
    let articles: Vec<NewsArticle> = read_collection(&dir.join(ARTICLES_FILE)).await?;
    let events: Vec<Event> = read_collection(&dir.join(EVENTS_FILE)).await?;
    info!(
        articles = articles.len(),
        events = events.len(),
        "Loaded content snapshot"
    );
    Ok((articles, events))
}

async fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ContentError> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Write the article collection to `{dir}/articles.json`.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), count = articles.len()))]
pub async fn write_articles(articles: &[NewsArticle], dir: &Path) -> Result<(), ContentError> {
    let json = serde_json::to_string_pretty(articles)?;

    if let Err(e) = fs::create_dir_all(dir).await {
        error!(error = %e, "Failed to create snapshot dir");
        return Err(e.into());
    }

    let final_path = dir.join(ARTICLES_FILE);
    let tmp_path = dir.join(format!("{ARTICLES_FILE}.tmp"));
    fs::write(&tmp_path, json).await?;
    fs::rename(&tmp_path, &final_path).await?;
    info!(path = %final_path.display(), "Wrote article snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn article(slug: &str) -> NewsArticle {
        NewsArticle {
            id: format!("test:{slug}"),
            slug: slug.to_string(),
            title: slug.to_string(),
            summary: None,
            content: None,
            url: format!("https://example.org/{slug}"),
            image_url: None,
            source: "test".to_string(),
            published_at: None,
            scraped_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            categories: vec![],
            tags: vec![],
            featured: false,
        }
    }

    #[tokio::test]
    async fn test_load_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let (articles, events) = load(tmp.path()).await.unwrap();
        assert!(articles.is_empty());
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_write_then_load_articles() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("data");
        write_articles(&[article("ferry-news"), article("road-works")], &dir)
            .await
            .unwrap();

        assert!(!dir.join("articles.json.tmp").exists());
        let (articles, _) = load(&dir).await.unwrap();
        let slugs: Vec<_> = articles.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, ["ferry-news", "road-works"]);
    }

    #[tokio::test]
    async fn test_load_rejects_corrupt_events() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(EVENTS_FILE), "[{").unwrap();
        let err = load(tmp.path()).await.unwrap_err();
        assert!(matches!(err, ContentError::Json(_)));
    }
}
