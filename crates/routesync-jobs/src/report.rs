//! Unfinished-routes report.
//!
//! Diagnostic sweep over dispatches whose `cierre` is not strictly true
//! (null and false both count). Collects the distinct routes and dispatch
//! dates still holding deliveries open, read-only.

use std::collections::BTreeSet;

use tracing::info;

use routesync_core::{Result, UnfinishedDispatch};
use routesync_db::Database;

/// Distinct routes and dates with unfinished dispatches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnfinishedReport {
    /// Total dispatches with `cierre != true`.
    pub dispatches: u64,
    /// Distinct `route_key` values, sorted.
    pub route_keys: Vec<String>,
    /// Distinct `route_dispatch_date` values, sorted.
    pub dispatch_dates: Vec<String>,
}

/// Aggregate the raw rows into the report.
pub fn unfinished_report(rows: &[UnfinishedDispatch]) -> UnfinishedReport {
    let mut route_keys = BTreeSet::new();
    let mut dispatch_dates = BTreeSet::new();

    for row in rows {
        route_keys.insert(row.route_key.clone());
        if let Some(date) = &row.route_dispatch_date {
            dispatch_dates.insert(date.clone());
        }
    }

    UnfinishedReport {
        dispatches: rows.len() as u64,
        route_keys: route_keys.into_iter().collect(),
        dispatch_dates: dispatch_dates.into_iter().collect(),
    }
}

/// Build the unfinished-routes report from the store.
pub async fn report_unfinished_routes(db: &Database) -> Result<UnfinishedReport> {
    let rows = db.dispatches.unfinished_rows().await?;
    let report = unfinished_report(&rows);

    info!(
        dispatches = report.dispatches,
        route_keys = report.route_keys.len(),
        dispatch_dates = report.dispatch_dates.len(),
        "Built unfinished-routes report"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(route_key: &str, date: Option<&str>) -> UnfinishedDispatch {
        UnfinishedDispatch {
            route_key: route_key.to_string(),
            route_dispatch_date: date.map(str::to_string),
        }
    }

    #[test]
    fn test_empty_rows_empty_report() {
        assert_eq!(unfinished_report(&[]), UnfinishedReport::default());
    }

    #[test]
    fn test_report_dedupes_and_sorts() {
        let rows = [
            row("R2", Some("2025-11-27")),
            row("R1", Some("2025-11-26")),
            row("R2", Some("2025-11-26")),
            row("R1", Some("2025-11-26")),
        ];
        let report = unfinished_report(&rows);

        assert_eq!(report.dispatches, 4);
        assert_eq!(report.route_keys, vec!["R1".to_string(), "R2".to_string()]);
        assert_eq!(
            report.dispatch_dates,
            vec!["2025-11-26".to_string(), "2025-11-27".to_string()]
        );
    }

    #[test]
    fn test_null_dates_are_counted_but_not_listed() {
        let rows = [row("R1", None), row("R1", None)];
        let report = unfinished_report(&rows);

        assert_eq!(report.dispatches, 2);
        assert_eq!(report.route_keys, vec!["R1".to_string()]);
        assert!(report.dispatch_dates.is_empty());
    }
}
