//! RSS 2.0 feed scraper.
//!
//! Reads `<item>` elements with `quick-xml`'s pull parser. Recognized child
//! elements: `title`, `link`, `description`, `pubDate` (RFC 2822),
//! `category` (repeatable, becomes a tag) and the `url` of an `enclosure`
//! typed `image/*`. Only direct, unprefixed children of `<item>` are read;
//! namespaced extensions such as `media:*` or `dc:*` and anything nested
//! inside them are ignored.

use crate::error::ScrapeError;
use crate::models::ScrapedItem;
use crate::utils::{clean_text, truncate_for_log};
use chrono::{DateTime, Utc};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use tracing::{info, instrument, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
    Category,
}

impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            b"pubDate" => Some(Field::PubDate),
            b"category" => Some(Field::Category),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct PartialItem {
    title: String,
    link: String,
    description: String,
    pub_date: String,
    categories: Vec<String>,
    image_url: Option<String>,
}

impl PartialItem {
    fn push(&mut self, field: Field, text: &str) {
        match field {
            Field::Title => self.title.push_str(text),
            Field::Link => self.link.push_str(text),
            Field::Description => self.description.push_str(text),
            Field::PubDate => self.pub_date.push_str(text),
            Field::Category => {
                if let Some(last) = self.categories.last_mut() {
                    last.push_str(text);
                }
            }
        }
    }

    /// Keep the first `<enclosure>` whose `type` is an image.
    fn take_enclosure(&mut self, tag: &BytesStart<'_>, base: &Url) {
        if self.image_url.is_some() {
            return;
        }
        let is_image = tag
            .try_get_attribute("type")
            .ok()
            .flatten()
            .is_some_and(|attr| attr.value.starts_with(b"image/"));
        if !is_image {
            return;
        }
        self.image_url = tag
            .try_get_attribute("url")
            .ok()
            .flatten()
            .and_then(|attr| base.join(String::from_utf8_lossy(&attr.value).trim()).ok())
            .map(String::from);
    }

    fn finish(self, base: &Url) -> Option<ScrapedItem> {
        let title = clean_text(&self.title);
        if title.is_empty() || self.link.trim().is_empty() {
            return None;
        }
        let link = base.join(self.link.trim()).ok()?.to_string();
        let summary = Some(clean_text(&self.description)).filter(|s| !s.is_empty());
        let published_at = DateTime::parse_from_rfc2822(self.pub_date.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
        let tags = self
            .categories
            .iter()
            .map(|c| clean_text(c))
            .filter(|c| !c.is_empty())
            .collect();
        Some(ScrapedItem {
            title,
            link,
            summary,
            image_url: self.image_url,
            published_at,
            tags,
        })
    }
}

/// Parse an RSS document into items.
///
/// Items missing a title or link are skipped.
///
/// # Errors
///
/// Fails on malformed XML or if `feed_url` is not absolute.
#[instrument(level = "info", skip(xml), fields(bytes = xml.len()))]
pub fn parse_feed(xml: &str, feed_url: &str) -> Result<Vec<ScrapedItem>, ScrapeError> {
    let base = Url::parse(feed_url).map_err(|e| ScrapeError::SourceUrl {
        url: feed_url.to_string(),
        reason: e.to_string(),
    })?;
    let mut reader = Reader::from_str(xml);

    let mut items = Vec::new();
    let mut current: Option<PartialItem> = None;
    let mut field: Option<Field> = None;
    // Open elements below the current `<item>`; only direct children count.
    let mut depth = 0usize;
    let mut skipped = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            warn!(preview = %truncate_for_log(xml, 200), "Unparseable feed body");
            ScrapeError::Feed(format!("at byte {}: {e}", reader.buffer_position()))
        })?;
        let active = field.filter(|_| depth == 1);
        match event {
            XmlEvent::Start(tag) => match current.as_mut() {
                None if tag.name().as_ref() == b"item" => {
                    current = Some(PartialItem::default());
                    depth = 0;
                }
                None => {}
                Some(item) => {
                    depth += 1;
                    if depth == 1 {
                        field = Field::from_tag(tag.name().as_ref());
                        if field == Some(Field::Category) {
                            item.categories.push(String::new());
                        }
                        if tag.name().as_ref() == b"enclosure" {
                            item.take_enclosure(&tag, &base);
                        }
                    }
                }
            },
            XmlEvent::Empty(tag) => {
                if let Some(item) = current.as_mut() {
                    if depth == 0 && tag.name().as_ref() == b"enclosure" {
                        item.take_enclosure(&tag, &base);
                    }
                }
            }
            XmlEvent::Text(text) => {
                if let (Some(item), Some(f)) = (current.as_mut(), active) {
                    item.push(f, &String::from_utf8_lossy(&text));
                }
            }
            XmlEvent::CData(data) => {
                if let (Some(item), Some(f)) = (current.as_mut(), active) {
                    item.push(f, &String::from_utf8_lossy(&data));
                }
            }
            XmlEvent::GeneralRef(entity) => {
                if let (Some(item), Some(f)) = (current.as_mut(), active) {
                    let resolved = match entity.resolve_char_ref() {
                        Ok(Some(ch)) => Some(ch.to_string()),
                        _ => {
                            let name = String::from_utf8_lossy(&entity).into_owned();
                            resolve_predefined_entity(&name).map(str::to_string)
                        }
                    };
                    match resolved {
                        Some(text) => item.push(f, &text),
                        None => warn!(entity = %String::from_utf8_lossy(&entity), "Unknown entity in feed"),
                    }
                }
            }
            XmlEvent::End(_) if current.is_some() && depth > 0 => {
                if depth == 1 {
                    field = None;
                }
                depth -= 1;
            }
            XmlEvent::End(tag) => {
                if tag.name().as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        match item.finish(&base) {
                            Some(done) => items.push(done),
                            None => skipped += 1,
                        }
                    }
                }
                field = None;
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }

    info!(count = items.len(), skipped, "Parsed feed");
    Ok(items)
}
