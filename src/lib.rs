//! # Regional Portal
//!
//! Backend for a regional news and events portal.
//!
//! - [`gateway`] serves a read-only JSON API over the content corpus and a
//!   trigger endpoint for the scraper.
//! - [`scrapers`] pulls listings from configured HTML pages and RSS feeds,
//!   normalizes them into articles and upserts them into [`content`].
//! - [`lifecycle`] stops background scraping exactly once on shutdown.
//! - [`trigger`] is the client used by the `trigger-scrape` binary.

pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod models;
pub mod scrapers;
pub mod trigger;
pub mod utils;
