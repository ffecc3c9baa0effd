//! Route closure evaluation.
//!
//! A route closes when every dispatch its payload lists reports a strictly
//! true `cierre`. The evaluator is a pure decision procedure: it never
//! repairs anything, it just re-runs on a cadence until the dispatches
//! converge, then flips the route exactly once.

use std::collections::HashMap;

use tracing::{info, warn};

use routesync_core::Result;
use routesync_db::Database;

use crate::extract::{dispatch_items, dispatch_key};

/// Outcome of the closure decision for one route.
#[derive(Debug, Clone, PartialEq)]
pub enum ClosureVerdict {
    /// Every listed dispatch (or none at all) reports `cierre == true`.
    Close,
    /// At least one listed dispatch blocks closure.
    Open {
        /// Listed keys with no stored dispatch record.
        missing: Vec<String>,
        /// Stored dispatches whose `cierre` is not strictly true.
        not_closed: Vec<String>,
    },
}

/// Decide whether a route can close, given its listed dispatch keys and the
/// stored `cierre` state per key.
///
/// An empty list is vacuously closed. `cierre` must be strictly `true`:
/// null, false, and a missing record all keep the route open.
pub fn closure_verdict(
    listed: &[String],
    states: &HashMap<String, Option<bool>>,
) -> ClosureVerdict {
    let mut missing = Vec::new();
    let mut not_closed = Vec::new();

    for key in listed {
        match states.get(key) {
            None => missing.push(key.clone()),
            Some(Some(true)) => {}
            Some(_) => not_closed.push(key.clone()),
        }
    }

    if missing.is_empty() && not_closed.is_empty() {
        ClosureVerdict::Close
    } else {
        ClosureVerdict::Open { missing, not_closed }
    }
}

/// Dispatch identifiers listed in a route payload.
fn listed_dispatch_keys(payload: &serde_json::Value) -> Vec<String> {
    dispatch_items(payload)
        .map(|items| items.iter().filter_map(dispatch_key).collect())
        .unwrap_or_default()
}

/// Evaluate closure for one route. Returns true when this run performed the
/// open-to-closed transition.
///
/// Missing route and already-closed route are both logged no-ops; closure
/// is terminal and idempotent.
pub async fn evaluate_route_closure(db: &Database, route_key: &str) -> Result<bool> {
    let Some(route) = db.routes.find_by_key(route_key).await? else {
        warn!(route_key, "No route record found; skipping closure check");
        return Ok(false);
    };

    if route.is_closed {
        info!(route_key, "Route is already closed; skipping");
        return Ok(false);
    }

    let listed = listed_dispatch_keys(route.working_payload());

    if listed.is_empty() {
        info!(route_key, "Route lists no dispatches; closing vacuously");
        return db.routes.mark_closed(route_key).await;
    }

    let states: HashMap<String, Option<bool>> = db
        .dispatches
        .closure_states(&listed)
        .await?
        .into_iter()
        .map(|row| (row.dispatch_key, row.cierre))
        .collect();

    match closure_verdict(&listed, &states) {
        ClosureVerdict::Close => {
            let closed = db.routes.mark_closed(route_key).await?;
            info!(
                route_key,
                dispatches = listed.len(),
                closed,
                "All dispatches report cierre == true; route marked closed"
            );
            Ok(closed)
        }
        ClosureVerdict::Open { missing, not_closed } => {
            info!(
                route_key,
                missing = ?missing,
                not_closed = ?not_closed,
                "Route stays open"
            );
            Ok(false)
        }
    }
}

/// Sweep variant: evaluate closure for every open route, optionally
/// restricted to one date. Returns how many routes closed this run.
pub async fn close_finished_routes(db: &Database, date: Option<&str>) -> Result<u64> {
    let keys = db.routes.open_keys(date).await?;
    info!(routes = keys.len(), ?date, "Evaluating closure for open routes");

    let mut closed = 0u64;
    for key in &keys {
        if evaluate_route_closure(db, key).await? {
            closed += 1;
        }
    }

    info!(routes = keys.len(), closed, "Finished closure sweep");
    Ok(closed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_list_is_vacuously_closed() {
        assert_eq!(closure_verdict(&[], &HashMap::new()), ClosureVerdict::Close);
    }

    #[test]
    fn test_all_true_closes() {
        let listed = keys(&["D1", "D2"]);
        let states = HashMap::from([
            ("D1".to_string(), Some(true)),
            ("D2".to_string(), Some(true)),
        ]);
        assert_eq!(closure_verdict(&listed, &states), ClosureVerdict::Close);
    }

    #[test]
    fn test_missing_dispatch_keeps_route_open() {
        let listed = keys(&["D1", "D2"]);
        let states = HashMap::from([("D1".to_string(), Some(true))]);
        assert_eq!(
            closure_verdict(&listed, &states),
            ClosureVerdict::Open {
                missing: keys(&["D2"]),
                not_closed: vec![],
            }
        );
    }

    #[test]
    fn test_false_and_null_cierre_keep_route_open() {
        let listed = keys(&["D1", "D2", "D3"]);
        let states = HashMap::from([
            ("D1".to_string(), Some(false)),
            ("D2".to_string(), None),
            ("D3".to_string(), Some(true)),
        ]);
        assert_eq!(
            closure_verdict(&listed, &states),
            ClosureVerdict::Open {
                missing: vec![],
                not_closed: keys(&["D1", "D2"]),
            }
        );
    }

    #[test]
    fn test_extra_stored_dispatches_are_ignored() {
        // Dispatches in the store but absent from the route list have no say.
        let listed = keys(&["D1"]);
        let states = HashMap::from([
            ("D1".to_string(), Some(true)),
            ("STRAY".to_string(), Some(false)),
        ]);
        assert_eq!(closure_verdict(&listed, &states), ClosureVerdict::Close);
    }
}
