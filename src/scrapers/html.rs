//! HTML listing scraper.
//!
//! A listing page (a municipality's news page, a venue's "what's on") is
//! turned into [`ScrapedItem`]s with the CSS selectors from the source's
//! [`HtmlSelectors`]. Each `item` match is one entry; title, link and the
//! optional fields are selected inside it.
//!
//! Relative links and image paths are resolved against the listing URL.

use crate::error::ScrapeError;
use crate::models::ScrapedItem;
use crate::scrapers::registry::HtmlSelectors;
use crate::utils::clean_text;
use chrono::{DateTime, NaiveDate, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

struct Compiled {
    item: Selector,
    title: Selector,
    link: Selector,
    summary: Option<Selector>,
    image: Option<Selector>,
    date: Option<Selector>,
}

fn compile(raw: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(raw).map_err(|_| ScrapeError::Selector(raw.to_string()))
}

impl Compiled {
    fn new(selectors: &HtmlSelectors) -> Result<Self, ScrapeError> {
        Ok(Self {
            item: compile(&selectors.item)?,
            title: compile(&selectors.title)?,
            link: compile(&selectors.link)?,
            summary: selectors.summary.as_deref().map(compile).transpose()?,
            image: selectors.image.as_deref().map(compile).transpose()?,
            date: selectors.date.as_deref().map(compile).transpose()?,
        })
    }
}

/// Parse a listing page into items.
///
/// Entries missing a title or a resolvable link are skipped.
///
/// # Errors
///
/// Fails if `listing_url` is not an absolute URL or a selector does not parse.
#[instrument(level = "info", skip(html, selectors), fields(bytes = html.len()))]
pub fn parse_listing(
    html: &str,
    listing_url: &str,
    selectors: &HtmlSelectors,
) -> Result<Vec<ScrapedItem>, ScrapeError> {
    let base = Url::parse(listing_url).map_err(|e| ScrapeError::SourceUrl {
        url: listing_url.to_string(),
        reason: e.to_string(),
    })?;
    let compiled = Compiled::new(selectors)?;
    let document = Html::parse_document(html);

    let mut items = Vec::new();
    let mut skipped = 0usize;
    for entry in document.select(&compiled.item) {
        match extract_item(&entry, &compiled, &base) {
            Some(item) => items.push(item),
            None => skipped += 1,
        }
    }

    info!(count = items.len(), skipped, "Parsed listing");
    Ok(items)
}

fn extract_item(entry: &ElementRef<'_>, compiled: &Compiled, base: &Url) -> Option<ScrapedItem> {
    let title = first_text(entry, &compiled.title)?;
    let href = first_attr(entry, &compiled.link, "href")?;
    let link = base.join(&href).ok()?.to_string();

    let summary = compiled.summary.as_ref().and_then(|s| first_text(entry, s));
    let image_url = compiled
        .image
        .as_ref()
        .and_then(|s| first_attr(entry, s, "src"))
        .and_then(|src| base.join(&src).ok())
        .map(|u| u.to_string());
    let published_at = compiled.date.as_ref().and_then(|s| {
        let node = entry.select(s).next()?;
        let raw = node
            .value()
            .attr("datetime")
            .map(str::to_string)
            .unwrap_or_else(|| inner_text(node));
        parse_date(&raw)
    });

    debug!(%title, %link, "Extracted listing entry");
    Some(ScrapedItem {
        title,
        link,
        summary,
        image_url,
        published_at,
        tags: Vec::new(),
    })
}

fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn first_text(entry: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    entry
        .select(selector)
        .next()
        .map(inner_text)
        .filter(|text| !text.is_empty())
}

fn first_attr(entry: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    // The selector may target the entry element itself, e.g. `a.card`.
    let own = selector
        .matches(entry)
        .then(|| entry.value().attr(attr))
        .flatten();
    own.or_else(|| entry.select(selector).find_map(|el| el.value().attr(attr)))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LISTING: &str = r#"
<html><body>
  <main>
    <article class="news-item">
      <h2>  Ferry timetable
        changes this summer </h2>
      <a href="/news/ferry-timetable">Read more</a>
      <p class="lead">New departures from the north pier.</p>
      <img src="/img/ferry.jpg">
      <time datetime="2025-06-03T08:30:00+02:00">3 June</time>
    </article>
    <article class="news-item">
      <h2>Council approves budget</h2>
      <a href="https://other.example.com/budget">Read more</a>
      <time>2025-06-01</time>
    </article>
    <article class="news-item">
      <h2>   </h2>
      <a href="/news/untitled">Read more</a>
    </article>
    <article class="news-item">
      <h2>No link here</h2>
    </article>
  </main>
</body></html>
"#;

    fn selectors() -> HtmlSelectors {
        HtmlSelectors {
            item: "article.news-item".to_string(),
            title: "h2".to_string(),
            link: "a[href]".to_string(),
            summary: Some("p.lead".to_string()),
            image: Some("img".to_string()),
            date: Some("time".to_string()),
        }
    }

    #[test]
    fn test_parse_listing_extracts_entries() {
        let items = parse_listing(LISTING, "https://city.example.org/news", &selectors()).unwrap();
        assert_eq!(items.len(), 2);

        let ferry = &items[0];
        assert_eq!(ferry.title, "Ferry timetable changes this summer");
        assert_eq!(ferry.link, "https://city.example.org/news/ferry-timetable");
        assert_eq!(ferry.summary.as_deref(), Some("New departures from the north pier."));
        assert_eq!(
            ferry.image_url.as_deref(),
            Some("https://city.example.org/img/ferry.jpg")
        );
        assert_eq!(
            ferry.published_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 3, 6, 30, 0).unwrap())
        );

        let budget = &items[1];
        assert_eq!(budget.link, "https://other.example.com/budget");
        assert!(budget.summary.is_none());
        assert_eq!(
            budget.published_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_link_on_item_element_itself() {
        let html = r#"<div><a class="card" href="/e/1"><span>Open day</span></a></div>"#;
        let selectors = HtmlSelectors {
            item: "a.card".to_string(),
            title: "span".to_string(),
            link: "a.card".to_string(),
            summary: None,
            image: None,
            date: None,
        };
        let items = parse_listing(html, "https://example.org/", &selectors).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.org/e/1");
    }

    #[test]
    fn test_invalid_selector() {
        let mut bad = selectors();
        bad.item = "article[".to_string();
        let err = parse_listing(LISTING, "https://example.org", &bad).unwrap_err();
        assert!(matches!(err, ScrapeError::Selector(s) if s == "article["));
    }

    #[test]
    fn test_relative_listing_url_rejected() {
        let err = parse_listing(LISTING, "/news", &selectors()).unwrap_err();
        assert!(matches!(err, ScrapeError::SourceUrl { .. }));
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2025-06-03T08:30:00Z").is_some());
        assert!(parse_date(" 2025-06-03 ").is_some());
        assert!(parse_date("June 3rd").is_none());
    }
}
