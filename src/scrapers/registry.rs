//! Source configurations and the registry that names them.
//!
//! Sources are declared in the settings file under `scraper.sources`, keyed
//! by a short id:
//!
//! ```yaml
//! city-hall:
//!   sourceName: City Hall
//!   url: https://example.org/news
//!   categories: [Politics]
//!   kind:
//!     type: html
//!     item: article.news-item
//!     title: h2
//!     link: a[href]
//! tourism-feed:
//!   sourceName: Visit the Region
//!   url: https://example.org/feed.xml
//!   kind: { type: rss }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything needed to ingest one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// Human-readable name, also accepted when looking a source up.
    pub source_name: String,
    /// Listing page or feed URL.
    pub url: String,
    pub kind: SourceKind,
    /// Categories stamped onto every article from this source.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Tags stamped onto every article from this source.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Marks every article from this source as featured.
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceKind {
    /// An HTML listing page scraped with CSS selectors.
    Html(HtmlSelectors),
    /// An RSS 2.0 feed.
    Rss,
}

/// CSS selectors for an HTML listing.
///
/// `item` selects each entry; the remaining selectors are evaluated inside
/// the entry. `link` must match an element carrying `href`; when it is the
/// same element as the title, point both at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlSelectors {
    pub item: String,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub summary: Option<String>,
    /// Must match an `img`; `src` is read.
    #[serde(default)]
    pub image: Option<String>,
    /// Element whose `datetime` attribute (or text) holds an RFC 3339 date.
    #[serde(default)]
    pub date: Option<String>,
}

/// Source id → config, iterated in id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRegistry(BTreeMap<String, SourceConfig>);

impl SourceRegistry {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SourceConfig)> {
        self.0.iter()
    }

    /// Find a source by id or by `source_name`, ignoring case.
    ///
    /// Ids are checked across the whole registry before names, so an id
    /// match always wins over another source whose name happens to collide.
    pub fn lookup(&self, query: &str) -> Option<(&str, &SourceConfig)> {
        let wanted = query.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.0
            .iter()
            .find(|(id, _)| id.to_lowercase() == wanted)
            .or_else(|| {
                self.0
                    .iter()
                    .find(|(_, config)| config.source_name.to_lowercase() == wanted)
            })
            .map(|(id, config)| (id.as_str(), config))
    }
}

impl FromIterator<(String, SourceConfig)> for SourceRegistry {
    fn from_iter<I: IntoIterator<Item = (String, SourceConfig)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rss(name: &str) -> SourceConfig {
        SourceConfig {
            source_name: name.to_string(),
            url: "https://example.org/feed.xml".to_string(),
            kind: SourceKind::Rss,
            categories: vec![],
            tags: vec![],
            featured: false,
        }
    }

    fn registry() -> SourceRegistry {
        [
            ("city-hall".to_string(), rss("City Hall")),
            ("harbour".to_string(), rss("Harbour Authority")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_lookup_by_id_ignores_case() {
        let registry = registry();
        let (id, config) = registry.lookup("CITY-HALL").unwrap();
        assert_eq!(id, "city-hall");
        assert_eq!(config.source_name, "City Hall");
    }

    #[test]
    fn test_lookup_by_name_ignores_case() {
        let registry = registry();
        let (id, _) = registry.lookup("harbour authority").unwrap();
        assert_eq!(id, "harbour");
    }

    #[test]
    fn test_lookup_unknown_or_blank() {
        let registry = registry();
        assert!(registry.lookup("weather").is_none());
        assert!(registry.lookup("   ").is_none());
    }

    #[test]
    fn test_id_match_wins_over_name_match() {
        let registry: SourceRegistry = [
            ("alpha".to_string(), rss("harbour")),
            ("harbour".to_string(), rss("Harbour Authority")),
        ]
        .into_iter()
        .collect();
        let (id, _) = registry.lookup("Harbour").unwrap();
        assert_eq!(id, "harbour");
    }

    #[test]
    fn test_registry_from_yaml() {
        let yaml = r#"
city-hall:
  sourceName: City Hall
  url: https://example.org/news
  categories: [Politics]
  kind:
    type: html
    item: article.news-item
    title: h2
    link: a[href]
    date: time
tourism:
  sourceName: Visit the Region
  url: https://example.org/feed.xml
  featured: true
  kind: { type: rss }
"#;
        let registry: SourceRegistry = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(registry.len(), 2);

        let city_hall = registry.lookup("city-hall").unwrap().1;
        match &city_hall.kind {
            SourceKind::Html(selectors) => {
                assert_eq!(selectors.item, "article.news-item");
                assert_eq!(selectors.date.as_deref(), Some("time"));
                assert!(selectors.summary.is_none());
            }
            SourceKind::Rss => panic!("expected html source"),
        }
        assert!(registry.lookup("tourism").unwrap().1.featured);
    }
}
