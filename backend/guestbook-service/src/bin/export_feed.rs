//! Export the approved, threaded feed as static JSON
//! Run with: cargo run --bin export-feed -- public/data/messages.json

use anyhow::Context;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;

use guestbook_service::config::Config;
use guestbook_service::db;
use guestbook_service::services::{GuestbookService, PageRequest, MAX_PAGE_LIMIT};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let output: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "public/data/messages.json".to_string())
        .into();

    let config = Config::load()?;
    let store = db::connect(&config.database).await?;
    store.ensure_schema().await?;
    let guestbook = GuestbookService::new(store, &config);

    let mut threads = Vec::new();
    let mut page = 1;
    loop {
        let feed = guestbook
            .public_feed(None, PageRequest::new(Some(page), Some(MAX_PAGE_LIMIT)))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read feed page {}: {}", page, e))?;

        threads.extend(feed.threads);
        if i64::from(page) >= feed.pagination.total_pages {
            break;
        }
        page += 1;
    }

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let exported = threads.len();
    let document = json!({
        "exported_at": Utc::now().to_rfc3339(),
        "data": threads,
    });
    tokio::fs::write(&output, serde_json::to_vec_pretty(&document)?)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Exported {} threads to {}", exported, output.display());
    Ok(())
}
