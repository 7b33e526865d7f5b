//! Client side of `GET /api/scrape`, used by the `trigger-scrape` binary.

use crate::cli::TriggerCli;
use anyhow::{bail, Context};
use serde_json::Value;
use tracing::{debug, instrument};

/// Build the scrape URL for `base`, optionally limited to one source.
///
/// A trailing slash on `base` is ignored and the source is percent-encoded.
pub fn scrape_url(base: &str, source: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    match source {
        Some(source) => format!("{base}/api/scrape?source={}", urlencoding::encode(source)),
        None => format!("{base}/api/scrape"),
    }
}

/// Ask the server to scrape and return its JSON reply.
///
/// Transport failures and non-2xx statuses are errors; the error message
/// carries the server's body when there is one.
#[instrument(level = "info", skip(cli), fields(source = ?cli.source))]
pub async fn run(cli: &TriggerCli) -> anyhow::Result<Value> {
    let url = scrape_url(&cli.api_base_url, cli.source.as_deref());
    debug!(%url, "Triggering scrape");

    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("request to {url} failed"))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("reading response from {url} failed"))?;

    if !status.is_success() {
        bail!("server answered {status}: {}", body.trim());
    }

    serde_json::from_str(&body).with_context(|| format!("response from {url} is not JSON"))
}
