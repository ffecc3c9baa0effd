//! Sub-status classification.
//!
//! Maps `substatus_code` through the sub-status reference mapping into the
//! three derived fields `estado_beetrack` / `estado_guia` / `cierre`.
//! Unlike the tag-derived backfills this one scans every dispatch in scope
//! and re-derives on each run: the upstream code can change after a
//! dispatch is first seen, and a stale `cierre` would wrongly hold a route
//! open or closed.
//!
//! An invalid code and a valid-but-unmatched code both force all three
//! outputs to null, so a prior run's values never outlive the code that
//! produced them.

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use routesync_core::{code_variants, Result, SubstatusMapping};
use routesync_db::Database;

use super::BackfillScope;

/// At most this many unmatched-code warnings are logged per run.
const UNMATCHED_WARN_LIMIT: u64 = 5;

/// Per-run outcome counters.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SubstatusSummary {
    pub scanned: u64,
    /// Codes that resolved to a mapping row.
    pub mapped: u64,
    /// Null/empty/NaN codes, forced to null outputs.
    pub invalid_code: u64,
    /// Valid codes with no mapping row, also forced to null outputs.
    pub unmatched: u64,
}

fn null_fields() -> SubstatusMapping {
    SubstatusMapping {
        estado_beetrack: None,
        estado_guia: None,
        cierre: None,
    }
}

/// Re-derive the sub-status fields for every dispatch in scope.
pub async fn backfill_substatus(db: &Database, scope: &BackfillScope) -> Result<SubstatusSummary> {
    info!(?scope, "Starting sub-status backfill");

    let rows = db.dispatches.with_codes(scope.route_key()).await?;
    let mut summary = SubstatusSummary::default();

    for row in rows {
        summary.scanned += 1;
        let code = row.substatus_code.as_ref().unwrap_or(&JsonValue::Null);

        let Some(variants) = code_variants(code) else {
            db.dispatches
                .set_substatus_fields(row.id, &null_fields())
                .await?;
            summary.invalid_code += 1;
            continue;
        };

        match db.reference.substatus_for_variants(&variants).await? {
            Some(mapping) => {
                db.dispatches.set_substatus_fields(row.id, &mapping).await?;
                debug!(
                    dispatch_key = %row.dispatch_key,
                    code = %code,
                    cierre = ?mapping.cierre,
                    "Sub-status mapped"
                );
                summary.mapped += 1;
            }
            None => {
                // A code with no mapping row still overwrites: leaving old
                // values in place would keep a stale classification alive.
                db.dispatches
                    .set_substatus_fields(row.id, &null_fields())
                    .await?;
                summary.unmatched += 1;
                if summary.unmatched <= UNMATCHED_WARN_LIMIT {
                    warn!(
                        dispatch_key = %row.dispatch_key,
                        code = %code,
                        "No sub-status mapping for code"
                    );
                }
            }
        }
    }

    info!(
        scanned = summary.scanned,
        mapped = summary.mapped,
        invalid_code = summary.invalid_code,
        unmatched = summary.unmatched,
        "Finished sub-status backfill"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_fields_are_all_none() {
        let fields = null_fields();
        assert_eq!(fields.estado_beetrack, None);
        assert_eq!(fields.estado_guia, None);
        assert_eq!(fields.cierre, None);
    }
}
