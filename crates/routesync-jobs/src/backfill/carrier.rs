//! Carrier-code resolution.
//!
//! Resolves the `CODCOMU` tag against the carrier reference mapping and
//! writes `ct` plus the external id it matched on. Tag-derived facts are
//! immutable once extracted, so only dispatches still missing `ct` are
//! scanned.

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use routesync_core::{tags, Result};
use routesync_db::Database;

use super::BackfillScope;

/// Per-run outcome counters.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CarrierSummary {
    pub scanned: u64,
    pub updated: u64,
    /// Dispatches without a usable `CODCOMU` tag.
    pub no_tag: u64,
    /// Tag present but the external id has no usable mapping row.
    pub not_found: u64,
}

/// Extract the carrier external id from a dispatch's tag list.
pub fn external_id_from_tags(tag_list: Option<&JsonValue>) -> Option<String> {
    tags::extract_tag_str(tag_list?, &tags::CODCOMU)
}

/// A mapping value is only usable when it is present and non-blank.
pub fn usable_ct(ct: Option<String>) -> Option<String> {
    let ct = ct?.trim().to_string();
    if ct.is_empty() {
        None
    } else {
        Some(ct)
    }
}

/// Backfill `ct` / `ct_match_codcomu` for dispatches missing a carrier code.
pub async fn backfill_carrier(db: &Database, scope: &BackfillScope) -> Result<CarrierSummary> {
    info!(?scope, "Starting carrier-code backfill");

    let rows = db.dispatches.missing_ct(scope.route_key()).await?;
    let mut summary = CarrierSummary::default();

    for row in rows {
        summary.scanned += 1;

        let Some(external_id) = external_id_from_tags(row.tags.as_ref()) else {
            debug!(dispatch_key = %row.dispatch_key, "No CODCOMU tag; skipped");
            summary.no_tag += 1;
            continue;
        };

        let Some(ct) = usable_ct(db.reference.carrier_ct(&external_id).await?) else {
            debug!(
                dispatch_key = %row.dispatch_key,
                external_id,
                "External id not found in carrier mapping; skipped"
            );
            summary.not_found += 1;
            continue;
        };

        db.dispatches.set_carrier(row.id, &ct, &external_id).await?;
        debug!(dispatch_key = %row.dispatch_key, external_id, ct, "Carrier code set");
        summary.updated += 1;
    }

    info!(
        scanned = summary.scanned,
        updated = summary.updated,
        no_tag = summary.no_tag,
        not_found = summary.not_found,
        "Finished carrier-code backfill"
    );
    Ok(summary)
}
