//! Order-type extraction.
//!
//! Copies the case-sensitive `TIPO_ORDEN` tag value into the `tipo_orden`
//! field. Absent or empty tags are skipped with no write.

use tracing::{debug, info};

use routesync_core::{tags, Result};
use routesync_db::Database;

use super::BackfillScope;

/// Per-run outcome counters.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OrderTypeSummary {
    pub scanned: u64,
    pub updated: u64,
    /// Dispatches without a usable `TIPO_ORDEN` tag.
    pub no_tag: u64,
}

/// Backfill `tipo_orden` for dispatches missing an order type.
pub async fn backfill_order_type(db: &Database, scope: &BackfillScope) -> Result<OrderTypeSummary> {
    info!(?scope, "Starting order-type backfill");

    let rows = db.dispatches.missing_tipo_orden(scope.route_key()).await?;
    let mut summary = OrderTypeSummary::default();

    for row in rows {
        summary.scanned += 1;

        let tipo_orden = row
            .tags
            .as_ref()
            .and_then(|t| tags::extract_tag_str(t, &tags::TIPO_ORDEN));

        match tipo_orden {
            Some(value) => {
                db.dispatches.set_tipo_orden(row.id, &value).await?;
                debug!(dispatch_key = %row.dispatch_key, tipo_orden = value, "Order type set");
                summary.updated += 1;
            }
            None => {
                debug!(dispatch_key = %row.dispatch_key, "TIPO_ORDEN not found; skipped");
                summary.no_tag += 1;
            }
        }
    }

    info!(
        scanned = summary.scanned,
        updated = summary.updated,
        no_tag = summary.no_tag,
        "Finished order-type backfill"
    );
    Ok(summary)
}
