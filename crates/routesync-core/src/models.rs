//! Row types and write models for routes and dispatches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// One delivery route for one calendar date.
///
/// `is_closed` is monotonic: it starts false, flips to true exactly once,
/// and is never reset. A closed route is immutable; ingestion and detail
/// refresh must not touch it again.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Route {
    pub id: Uuid,
    /// Stable external identifier (upstream `number`/`route_number`/`id`).
    pub route_key: String,
    /// Calendar date the route belongs to (`YYYY-MM-DD`).
    pub date: String,
    /// Listing page where the route was last seen.
    pub page: i32,
    /// Listing-level payload from the routes index endpoint.
    pub minified_raw: JsonValue,
    /// Detail payload from `/routes/{route_key}`, once fetched.
    pub full_raw: Option<JsonValue>,
    pub has_full_details: bool,
    pub is_closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_refreshed_at: DateTime<Utc>,
}

impl Route {
    /// The payload downstream stages should read: the detail payload when
    /// it was fetched, the listing payload otherwise.
    pub fn working_payload(&self) -> &JsonValue {
        self.full_raw.as_ref().unwrap_or(&self.minified_raw)
    }
}

/// Write model for one route item from the listing endpoint.
#[derive(Debug, Clone)]
pub struct RouteUpsert {
    pub route_key: String,
    pub date: String,
    pub page: i32,
    pub minified_raw: JsonValue,
}

/// Write model for one dispatch flattened out of a route payload.
///
/// `dispatch_raw` is the verbatim embedded payload; the remaining scalar
/// fields mirror the values most queries need without digging into JSON.
/// `substatus_code` stays JSON because the upstream sends it as a string or
/// a number interchangeably.
#[derive(Debug, Clone)]
pub struct DispatchUpsert {
    pub dispatch_key: String,
    pub route_id: Uuid,
    pub route_key: String,
    pub route_dispatch_date: Option<String>,
    pub route_page: Option<i32>,
    pub truck_identifier: Option<String>,
    pub dispatch_raw: JsonValue,
    pub status: Option<String>,
    pub status_id: Option<i64>,
    pub substatus: Option<String>,
    pub substatus_code: Option<JsonValue>,
    pub is_trunk: Option<bool>,
    pub is_pickup: Option<bool>,
    pub estimated_at: Option<String>,
    pub min_delivery_time: Option<String>,
    pub max_delivery_time: Option<String>,
    pub delivery_time: Option<String>,
    pub beecode: Option<String>,
}

/// Projection used by backfill scans: the dispatch id plus the raw tag list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DispatchTags {
    pub id: Uuid,
    pub dispatch_key: String,
    /// `dispatch_raw->'tags'`; may be SQL NULL when the payload had none.
    pub tags: Option<JsonValue>,
}

/// Projection used by the sub-status backfill.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DispatchCode {
    pub id: Uuid,
    pub dispatch_key: String,
    pub substatus_code: Option<JsonValue>,
}

/// Projection used by the closure evaluator.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DispatchClosure {
    pub dispatch_key: String,
    pub cierre: Option<bool>,
}

/// Projection used by the unfinished-routes report: the route linkage of a
/// dispatch whose `cierre` is not strictly true.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnfinishedDispatch {
    pub route_key: String,
    pub route_dispatch_date: Option<String>,
}

/// One row of the read-only sub-status reference mapping.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SubstatusMapping {
    pub estado_beetrack: Option<String>,
    pub estado_guia: Option<String>,
    pub cierre: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route(full_raw: Option<JsonValue>) -> Route {
        Route {
            id: Uuid::new_v4(),
            route_key: "44800796".to_string(),
            date: "2025-11-26".to_string(),
            page: 1,
            minified_raw: json!({"number": "44800796", "source": "listing"}),
            full_raw,
            has_full_details: false,
            is_closed: false,
            closed_at: None,
            created_at: Utc::now(),
            last_refreshed_at: Utc::now(),
        }
    }

    #[test]
    fn test_working_payload_prefers_full_raw() {
        let r = route(Some(json!({"source": "detail"})));
        assert_eq!(r.working_payload()["source"], "detail");
    }

    #[test]
    fn test_working_payload_falls_back_to_minified() {
        let r = route(None);
        assert_eq!(r.working_payload()["source"], "listing");
    }
}
