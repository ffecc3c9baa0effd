//! Per-route dispatch extraction.
//!
//! Flattens the dispatch list embedded in a route's working payload into
//! individual dispatch records, carrying route-level metadata along. Runs on
//! a cadence and is a safe re-entrant: the upsert key is the dispatch's
//! natural identifier, so re-extracting an unchanged route rewrites the
//! same records in place.

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use routesync_core::{DispatchUpsert, Result, Route};
use routesync_db::Database;

use crate::stringify_field;

/// The embedded dispatch list of a route payload, or `None` when the
/// payload has no `dispatches` array.
pub fn dispatch_items(payload: &JsonValue) -> Option<&Vec<JsonValue>> {
    payload.get("dispatches")?.as_array()
}

/// Natural unique key of one embedded dispatch: its `identifier`,
/// stringified. An empty identifier is "no key", the same as a missing one.
pub fn dispatch_key(item: &JsonValue) -> Option<String> {
    stringify_field(item, "identifier").filter(|key| !key.trim().is_empty())
}

/// Build the merged dispatch record for one embedded item.
fn flatten_dispatch(
    route: &Route,
    route_dispatch_date: &Option<String>,
    truck_identifier: &Option<String>,
    dispatch_key: String,
    item: &JsonValue,
) -> DispatchUpsert {
    DispatchUpsert {
        dispatch_key,
        route_id: route.id,
        route_key: route.route_key.clone(),
        route_dispatch_date: route_dispatch_date.clone(),
        route_page: Some(route.page),
        truck_identifier: truck_identifier.clone(),
        dispatch_raw: item.clone(),
        status: stringify_field(item, "status"),
        status_id: item.get("status_id").and_then(JsonValue::as_i64),
        substatus: stringify_field(item, "substatus"),
        substatus_code: item
            .get("substatus_code")
            .filter(|v| !v.is_null())
            .cloned(),
        is_trunk: item.get("is_trunk").and_then(JsonValue::as_bool),
        is_pickup: item.get("is_pickup").and_then(JsonValue::as_bool),
        estimated_at: stringify_field(item, "estimated_at"),
        min_delivery_time: stringify_field(item, "min_delivery_time"),
        max_delivery_time: stringify_field(item, "max_delivery_time"),
        delivery_time: stringify_field(item, "delivery_time"),
        beecode: stringify_field(item, "beecode"),
    }
}

/// Extract all dispatches of one route and upsert them by natural key.
///
/// A route that has not been ingested yet is a no-op, not an error: the
/// pipeline stages run on independent cadences and this one may simply be
/// early. Returns the number of dispatches upserted.
pub async fn extract_dispatches(db: &Database, route_key: &str) -> Result<u64> {
    let Some(route) = db.routes.find_by_key(route_key).await? else {
        warn!(route_key, "No route record found; skipping extraction");
        return Ok(0);
    };

    let payload = route.working_payload();

    let Some(items) = dispatch_items(payload) else {
        warn!(route_key, "Route payload has no dispatch list");
        return Ok(0);
    };

    // Prefer the payload's own dispatch date, fall back to the ingested date.
    let route_dispatch_date =
        stringify_field(payload, "dispatch_date").or_else(|| Some(route.date.clone()));
    let truck_identifier = payload
        .get("truck")
        .map(|truck| stringify_field(truck, "identifier"))
        .unwrap_or(None);

    info!(
        route_key,
        page = route.page,
        count = items.len(),
        "Extracting dispatches from route payload"
    );

    let mut batch = Vec::with_capacity(items.len());
    for item in items {
        match dispatch_key(item) {
            Some(key) => batch.push(flatten_dispatch(
                &route,
                &route_dispatch_date,
                &truck_identifier,
                key,
                item,
            )),
            None => warn!(route_key, item = %item, "Skipping dispatch without identifier"),
        }
    }

    db.dispatches.upsert_batch(&batch).await?;

    info!(
        route_key,
        upserted = batch.len(),
        "Finished dispatch extraction"
    );
    Ok(batch.len() as u64)
}

/// Sweep variant: extract dispatches for every open route, optionally
/// restricted to one date. Used by the scheduler.
pub async fn extract_open_routes(db: &Database, date: Option<&str>) -> Result<u64> {
    let keys = db.routes.open_keys(date).await?;
    info!(routes = keys.len(), ?date, "Extracting dispatches for open routes");

    let mut total = 0u64;
    for key in &keys {
        total += extract_dispatches(db, key).await?;
    }

    info!(routes = keys.len(), dispatches = total, "Finished extraction sweep");
    Ok(total)
}
