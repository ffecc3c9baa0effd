//! Promise-date normalization.
//!
//! Reads the case-sensitive `FECSOLDES` tag (raw `YYYYMMDD`) and writes
//! both the raw value and its ISO form. Absent or malformed tags are
//! skipped with no write; the field simply stays absent, unlike the
//! sub-status job which actively nulls its outputs.

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use routesync_core::{normalize_promise_date, tags, Result};
use routesync_db::Database;

use super::BackfillScope;

/// Per-run outcome counters.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PromiseDateSummary {
    pub scanned: u64,
    pub updated: u64,
    /// Dispatches without a `FECSOLDES` tag.
    pub no_tag: u64,
    /// Tag present but not exactly eight digits.
    pub invalid_format: u64,
}

/// Per-record decision, separated from storage for tests.
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseDecision {
    NoTag,
    Invalid(String),
    Set { raw: String, normalized: String },
}

/// Decide what to do with one dispatch's tag list.
pub fn promise_decision(tag_list: Option<&JsonValue>) -> PromiseDecision {
    let Some(raw) = tag_list.and_then(|t| tags::extract_tag(t, &tags::FECSOLDES)) else {
        return PromiseDecision::NoTag;
    };

    let raw = tags::stringify(raw);
    match normalize_promise_date(&raw) {
        Some(normalized) => PromiseDecision::Set { raw, normalized },
        None => PromiseDecision::Invalid(raw),
    }
}

/// Backfill `promise_date_raw` / `promise_date` for dispatches missing a
/// promise date.
pub async fn backfill_promise_date(
    db: &Database,
    scope: &BackfillScope,
) -> Result<PromiseDateSummary> {
    info!(?scope, "Starting promise-date backfill");

    let rows = db.dispatches.missing_promise_date(scope.route_key()).await?;
    let mut summary = PromiseDateSummary::default();

    for row in rows {
        summary.scanned += 1;

        match promise_decision(row.tags.as_ref()) {
            PromiseDecision::NoTag => {
                debug!(dispatch_key = %row.dispatch_key, "FECSOLDES not found; skipped");
                summary.no_tag += 1;
            }
            PromiseDecision::Invalid(raw) => {
                debug!(
                    dispatch_key = %row.dispatch_key,
                    raw,
                    "FECSOLDES has invalid format; skipped"
                );
                summary.invalid_format += 1;
            }
            PromiseDecision::Set { raw, normalized } => {
                db.dispatches
                    .set_promise_date(row.id, &raw, &normalized)
                    .await?;
                debug!(
                    dispatch_key = %row.dispatch_key,
                    raw,
                    normalized,
                    "Promise date set"
                );
                summary.updated += 1;
            }
        }
    }

    info!(
        scanned = summary.scanned,
        updated = summary.updated,
        no_tag = summary.no_tag,
        invalid_format = summary.invalid_format,
        "Finished promise-date backfill"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decision_no_tag() {
        assert_eq!(promise_decision(None), PromiseDecision::NoTag);
        let tags = json!([{"name": "fecsoldes", "value": "20251126"}]);
        assert_eq!(promise_decision(Some(&tags)), PromiseDecision::NoTag);
    }

    #[test]
    fn test_decision_valid() {
        let tags = json!([{"name": "FECSOLDES", "value": "20251126"}]);
        assert_eq!(
            promise_decision(Some(&tags)),
            PromiseDecision::Set {
                raw: "20251126".to_string(),
                normalized: "2025-11-26".to_string(),
            }
        );
    }

    #[test]
    fn test_decision_numeric_tag_value() {
        let tags = json!([{"name": "FECSOLDES", "value": 20251126}]);
        assert_eq!(
            promise_decision(Some(&tags)),
            PromiseDecision::Set {
                raw: "20251126".to_string(),
                normalized: "2025-11-26".to_string(),
            }
        );
    }

    #[test]
    fn test_decision_invalid_format() {
        let tags = json!([{"name": "FECSOLDES", "value": "2025-11-26"}]);
        assert_eq!(
            promise_decision(Some(&tags)),
            PromiseDecision::Invalid("2025-11-26".to_string())
        );
    }
}
