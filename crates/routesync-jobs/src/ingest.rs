//! Route ingestion from the upstream listing endpoint.

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use routesync_client::TrackClient;
use routesync_core::{Result, RouteUpsert};
use routesync_db::Database;

use crate::stringify_field;

/// Derive the stable external key for one route listing item.
///
/// Upstream is inconsistent about which field carries the identifier, so we
/// accept `number`, `route_number`, and `id` in that priority order, taking
/// the first non-null, non-blank one. An empty string is "no key", the same
/// as null.
pub fn extract_route_key(route: &JsonValue) -> Option<String> {
    for field in ["number", "route_number", "id"] {
        if let Some(key) = stringify_field(route, field) {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
    }
    None
}

/// Ingest routes for a date.
///
/// With `page` given, fetches and upserts only that page. Otherwise pages
/// through the listing from 1 until the upstream returns an empty page,
/// which is the normal end-of-listing signal. Returns the number of routes
/// upserted.
///
/// An upstream failure aborts the current page and propagates; pages
/// already flushed stay committed, so a retry simply re-covers the ground.
pub async fn ingest_routes(
    db: &Database,
    client: &TrackClient,
    date: &str,
    page: Option<u32>,
) -> Result<u64> {
    info!(date, ?page, "Starting route ingestion");

    let mut total = 0u64;

    if let Some(page) = page {
        total += ingest_page(db, client, date, page).await?;
    } else {
        let mut page = 1u32;
        loop {
            let count = ingest_page(db, client, date, page).await?;
            if count == 0 {
                info!(date, page, "No more routes; listing exhausted");
                break;
            }
            total += count;
            page += 1;
        }
    }

    info!(date, total, "Finished route ingestion");
    Ok(total)
}

/// Fetch and upsert a single (date, page) of the listing. Returns the
/// number of routes upserted; zero means the listing is exhausted at this
/// page.
async fn ingest_page(db: &Database, client: &TrackClient, date: &str, page: u32) -> Result<u64> {
    let items = client.fetch_routes_page(date, page).await?;
    if items.is_empty() {
        return Ok(0);
    }

    info!(date, page, count = items.len(), "Fetched routes page");

    let mut batch = Vec::with_capacity(items.len());
    for item in &items {
        match extract_route_key(item) {
            Some(route_key) => batch.push(RouteUpsert {
                route_key,
                date: date.to_string(),
                page: page as i32,
                minified_raw: item.clone(),
            }),
            None => warn!(date, page, item = %item, "Skipping route without a usable key"),
        }
    }

    db.routes.upsert_page(&batch).await?;
    Ok(batch.len() as u64)
}
