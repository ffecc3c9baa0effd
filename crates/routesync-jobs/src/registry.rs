//! Default job table.
//!
//! Wires every pipeline job onto the scheduler with its production cadence.
//! Date-scoped jobs resolve "today" (UTC) at each firing, not at registration,
//! so a long-lived process rolls over to the new day on its own.

use chrono::Utc;

use routesync_client::TrackClient;
use routesync_core::Result;
use routesync_db::Database;

use crate::backfill::{
    backfill_carrier, backfill_order_type, backfill_promise_date, backfill_substatus,
    BackfillScope,
};
use crate::scheduler::{JobSpec, Scheduler, Trigger};
use crate::{closure, details, extract, ingest};

/// Cadence of the route-page ingest job.
pub const INGEST_CRON: &str = "*/10 * * * *";
/// Cadence of the full-detail refresh job, seconds.
pub const DETAILS_INTERVAL_SECS: u64 = 300;
/// Cadence of the dispatch extraction sweep, seconds.
pub const EXTRACT_INTERVAL_SECS: u64 = 300;
/// Cadence of every backfill job, seconds.
pub const BACKFILL_INTERVAL_SECS: u64 = 600;
/// Cadence of the route closure sweep, seconds.
pub const CLOSURE_INTERVAL_SECS: u64 = 600;

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Build a scheduler carrying the full production job table.
pub fn default_scheduler(db: Database, client: TrackClient) -> Result<Scheduler> {
    let scheduler = Scheduler::new()
        .with_job(JobSpec::new("ingest_routes", Trigger::cron(INGEST_CRON)?, {
            let db = db.clone();
            let client = client.clone();
            move || {
                let db = db.clone();
                let client = client.clone();
                async move {
                    ingest::ingest_routes(&db, &client, &today(), None).await?;
                    Ok(())
                }
            }
        }))
        .with_job(JobSpec::new(
            "refresh_details",
            Trigger::interval_secs(DETAILS_INTERVAL_SECS),
            {
                let db = db.clone();
                let client = client.clone();
                move || {
                    let db = db.clone();
                    let client = client.clone();
                    async move {
                        details::refresh_route_details(&db, &client, &today()).await?;
                        Ok(())
                    }
                }
            },
        ))
        .with_job(JobSpec::new(
            "extract_dispatches",
            Trigger::interval_secs(EXTRACT_INTERVAL_SECS),
            {
                let db = db.clone();
                move || {
                    let db = db.clone();
                    async move {
                        extract::extract_open_routes(&db, None).await?;
                        Ok(())
                    }
                }
            },
        ))
        .with_job(JobSpec::new(
            "backfill_carrier",
            Trigger::interval_secs(BACKFILL_INTERVAL_SECS),
            {
                let db = db.clone();
                move || {
                    let db = db.clone();
                    async move {
                        backfill_carrier(&db, &BackfillScope::Global).await?;
                        Ok(())
                    }
                }
            },
        ))
        .with_job(JobSpec::new(
            "backfill_substatus",
            Trigger::interval_secs(BACKFILL_INTERVAL_SECS),
            {
                let db = db.clone();
                move || {
                    let db = db.clone();
                    async move {
                        backfill_substatus(&db, &BackfillScope::Global).await?;
                        Ok(())
                    }
                }
            },
        ))
        .with_job(JobSpec::new(
            "backfill_promise_date",
            Trigger::interval_secs(BACKFILL_INTERVAL_SECS),
            {
                let db = db.clone();
                move || {
                    let db = db.clone();
                    async move {
                        backfill_promise_date(&db, &BackfillScope::Global).await?;
                        Ok(())
                    }
                }
            },
        ))
        .with_job(JobSpec::new(
            "backfill_order_type",
            Trigger::interval_secs(BACKFILL_INTERVAL_SECS),
            {
                let db = db.clone();
                move || {
                    let db = db.clone();
                    async move {
                        backfill_order_type(&db, &BackfillScope::Global).await?;
                        Ok(())
                    }
                }
            },
        ))
        .with_job(JobSpec::new(
            "close_routes",
            Trigger::interval_secs(CLOSURE_INTERVAL_SECS),
            {
                let db = db.clone();
                move || {
                    let db = db.clone();
                    async move {
                        closure::close_finished_routes(&db, None).await?;
                        Ok(())
                    }
                }
            },
        ));

    Ok(scheduler)
}
