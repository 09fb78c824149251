//! Offline and one-shot scraping commands.

use std::path::Path;

use anyhow::Context;
use tmboard_core::{BoardTable, MalformedRowPolicy};
use tmboard_scraper::{extract_table, transcode_html, BoardClient, ExtractOptions, TableRows};

pub(crate) fn run_transcode(html: &str) -> anyhow::Result<String> {
    Ok(transcode_html(html)?)
}

pub(crate) async fn read_page(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Fetches once, without retries.
pub(crate) async fn fetch_page(
    url: &str,
    timeout_secs: u64,
    user_agent: &str,
) -> anyhow::Result<String> {
    let client = BoardClient::new(timeout_secs, user_agent, 0, 0)?;
    Ok(client.fetch_html(url).await?)
}

/// Extracts `table` from `body` and renders the rows as pretty JSON.
pub(crate) fn run_extract(
    table: BoardTable,
    body: &str,
    skip_malformed: bool,
) -> anyhow::Result<String> {
    let policy = if skip_malformed {
        MalformedRowPolicy::Skip
    } else {
        MalformedRowPolicy::Abort
    };
    let rows = extract_table(table, body, &ExtractOptions::with_policy(policy))?;
    tracing::info!(%table, rows = rows.len(), "extracted rows");

    let json = match &rows {
        TableRows::Results(rows) => serde_json::to_string_pretty(rows)?,
        TableRows::Maps(rows) => serde_json::to_string_pretty(rows)?,
    };
    Ok(json)
}
