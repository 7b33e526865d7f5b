//! Command-line interface definitions.
//!
//! Two binaries share this module: the API server and `trigger-scrape`, the
//! out-of-process helper that asks a running server to scrape. Options can
//! also be set through the environment variables named below.

use clap::Parser;
use std::path::PathBuf;

/// Arguments for the API server.
///
/// # Examples
///
/// ```sh
/// # Defaults: config/portal.yaml, bind address from the file
/// regional_portal
///
/// # Explicit config and port
/// regional_portal --config /etc/portal.yaml --port 8080
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct ServeCli {
    /// Path to the YAML settings file
    #[arg(short, long, env = "PORTAL_CONFIG", default_value = "config/portal.yaml")]
    pub config: PathBuf,

    /// Runtime environment: development, production or test
    #[arg(long, env = "PORTAL_ENV")]
    pub environment: Option<String>,

    /// Override the listen host from the settings file
    #[arg(long)]
    pub host: Option<String>,

    /// Override the listen port from the settings file
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Start background scraping right after startup: one pass, or the
    /// recurring loop when `scraper.interval_secs` is set
    #[arg(long)]
    pub scrape_on_start: bool,
}

/// Arguments for `trigger-scrape`.
///
/// ```sh
/// trigger-scrape                     # every source
/// trigger-scrape --source=city-hall  # one source, by id or name
/// ```
#[derive(Parser, Debug)]
#[command(name = "trigger-scrape", author, version, about = "Ask a running portal server to scrape")]
pub struct TriggerCli {
    /// Source id or name to scrape; omit to scrape everything
    #[arg(long)]
    pub source: Option<String>,

    /// Base URL of the portal server
    #[arg(long, env = "API_BASE_URL", default_value = "http://localhost:3000")]
    pub api_base_url: String,
}
