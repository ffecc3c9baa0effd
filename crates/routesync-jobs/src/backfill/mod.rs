//! Field backfill jobs.
//!
//! Four independent transforms, each enriching dispatch records with one
//! derived field (or field group). They share the same shape: scan the
//! dispatches in scope, decide per record, write per record, and emit one
//! summary line. Three of them only touch records where the target field is
//! still absent; the sub-status job always re-derives because its source
//! (`substatus_code`) can change upstream after a dispatch is first seen.
//!
//! No per-record failure aborts a run; only store connectivity errors do.

pub mod carrier;
pub mod order_type;
pub mod promise_date;
pub mod substatus;

pub use carrier::{backfill_carrier, CarrierSummary};
pub use order_type::{backfill_order_type, OrderTypeSummary};
pub use promise_date::{backfill_promise_date, PromiseDateSummary};
pub use substatus::{backfill_substatus, SubstatusSummary};

/// Operating scope shared by every backfill job.
#[derive(Debug, Clone, Default)]
pub enum BackfillScope {
    /// Sweep every dispatch in the store.
    #[default]
    Global,
    /// Sweep only the dispatches of one route.
    Route(String),
}

impl BackfillScope {
    /// The route-key filter to pass to repository scans.
    pub fn route_key(&self) -> Option<&str> {
        match self {
            BackfillScope::Global => None,
            BackfillScope::Route(key) => Some(key.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_route_key() {
        assert_eq!(BackfillScope::Global.route_key(), None);
        assert_eq!(
            BackfillScope::Route("44800796".to_string()).route_key(),
            Some("44800796")
        );
    }
}
