//! # routesync-jobs
//!
//! The synchronization pipeline: route ingestion, full-detail refresh,
//! dispatch extraction, the tag backfills, route closure, and the scheduler
//! that runs them all on their production cadence.
//!
//! Every job follows the same shape: read candidate rows through the
//! repositories in `routesync-db`, derive values with the pure helpers in
//! `routesync-core`, write the results back, and return a summary for the
//! caller's logs. Jobs are plain async functions so the CLI can run any of
//! them one-off with the same code path the scheduler uses.

use serde_json::Value as JsonValue;

pub mod backfill;
pub mod closure;
pub mod details;
pub mod extract;
pub mod ingest;
pub mod registry;
pub mod report;
pub mod scheduler;

pub use backfill::{
    backfill_carrier, backfill_order_type, backfill_promise_date, backfill_substatus,
    BackfillScope, CarrierSummary, OrderTypeSummary, PromiseDateSummary, SubstatusSummary,
};
pub use closure::{close_finished_routes, evaluate_route_closure};
pub use details::refresh_route_details;
pub use extract::{extract_dispatches, extract_open_routes};
pub use ingest::ingest_routes;
pub use registry::default_scheduler;
pub use report::{report_unfinished_routes, UnfinishedReport};
pub use scheduler::{JobSpec, Scheduler, SchedulerHandle, Trigger};

/// Read `field` from a JSON object and stringify it.
///
/// Upstream payloads are loose about scalar types, so identifiers and dates
/// arrive as strings or numbers interchangeably. Returns `None` when the
/// field is absent or null.
pub fn stringify_field(obj: &JsonValue, field: &str) -> Option<String> {
    let value = obj.get(field)?;
    if value.is_null() {
        return None;
    }
    Some(routesync_core::tags::stringify(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stringify_field_string_and_number() {
        let obj = json!({"id": 42, "number": "R-9"});
        assert_eq!(stringify_field(&obj, "id"), Some("42".to_string()));
        assert_eq!(stringify_field(&obj, "number"), Some("R-9".to_string()));
    }

    #[test]
    fn test_stringify_field_absent_or_null() {
        let obj = json!({"id": null});
        assert_eq!(stringify_field(&obj, "id"), None);
        assert_eq!(stringify_field(&obj, "missing"), None);
    }
}
