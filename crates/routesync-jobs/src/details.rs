//! Route detail refresh.
//!
//! While a route stays open its full payload can keep changing upstream, so
//! every open route of the date gets its `/routes/{key}` detail re-fetched
//! on each run. Closed routes are immutable and are never re-fetched.

use tracing::{error, info};

use routesync_client::TrackClient;
use routesync_core::Result;
use routesync_db::Database;

/// Refresh `full_raw` for all open routes of a date.
///
/// A per-route upstream failure is logged and skipped; only store failures
/// abort the sweep. Returns the number of routes refreshed.
pub async fn refresh_route_details(db: &Database, client: &TrackClient, date: &str) -> Result<u64> {
    let keys = db.routes.open_keys(Some(date)).await?;
    info!(date, routes = keys.len(), "Starting route detail refresh");

    let mut updated = 0u64;
    let mut failed = 0u64;

    for route_key in &keys {
        let payload = match client.fetch_route_details(route_key).await {
            Ok(payload) => payload,
            Err(e) => {
                error!(route_key, error = %e, "Failed to fetch route details");
                failed += 1;
                continue;
            }
        };

        if db.routes.store_full_details(route_key, &payload).await? {
            updated += 1;
        }
    }

    info!(date, updated, failed, "Finished route detail refresh");
    Ok(updated)
}
