//! routesync command-line entry point.
//!
//! Every pipeline job is exposed as a one-off subcommand, and `scheduler`
//! runs the full recurring job table until interrupted. One-off runs and
//! scheduled runs share the same job functions, so behavior is identical
//! either way.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routesync_client::TrackClient;
use routesync_core::Config;
use routesync_db::Database;
use routesync_jobs::{
    backfill_carrier, backfill_order_type, backfill_promise_date, backfill_substatus,
    close_finished_routes, default_scheduler, evaluate_route_closure, extract_dispatches,
    extract_open_routes, ingest_routes, refresh_route_details, report_unfinished_routes,
    BackfillScope,
};

#[derive(Parser)]
#[command(name = "routesync", version, about = "Delivery route synchronization pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch route pages for a date and upsert them into the store
    IngestRoutes {
        /// Dispatch date, YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Fetch a single page instead of paginating to exhaustion
        #[arg(long)]
        page: Option<u32>,
    },
    /// Fetch full route details for the open routes of a date
    RefreshDetails {
        /// Dispatch date, YYYY-MM-DD
        #[arg(long)]
        date: String,
    },
    /// Extract and upsert the dispatches embedded in stored routes
    ExtractDispatches {
        /// Limit to one route; omit to sweep every open route
        #[arg(long)]
        route_key: Option<String>,
    },
    /// Fill carrier codes from the CODCOMU tag
    BackfillCarrier {
        /// Limit to one route's dispatches
        #[arg(long)]
        route_key: Option<String>,
    },
    /// Derive tracking state fields from sub-status codes
    BackfillSubstatus {
        /// Limit to one route's dispatches
        #[arg(long)]
        route_key: Option<String>,
    },
    /// Fill promise dates from the FECSOLDES tag
    BackfillPromiseDate {
        /// Limit to one route's dispatches
        #[arg(long)]
        route_key: Option<String>,
    },
    /// Fill order types from the TIPO_ORDEN tag
    BackfillOrderType {
        /// Limit to one route's dispatches
        #[arg(long)]
        route_key: Option<String>,
    },
    /// Evaluate closure for one route, or sweep every open route
    CloseRoutes {
        /// Limit to one route; omit to sweep
        #[arg(long)]
        route_key: Option<String>,
    },
    /// List distinct routes and dates with dispatches not yet closed
    UnfinishedRoutes,
    /// Run the full recurring job table until interrupted
    Scheduler,
}

fn scope(route_key: Option<String>) -> BackfillScope {
    match route_key {
        Some(key) => BackfillScope::Route(key),
        None => BackfillScope::Global,
    }
}

fn init_tracing() {
    // LOG_FORMAT: "json" or "text" (default "text"); RUST_LOG filters as usual.
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "routesync=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to the database")?;
    db.migrate().await.context("Failed to run migrations")?;
    let client = TrackClient::from_config(&config)?;

    match cli.command {
        Command::IngestRoutes { date, page } => {
            let stored = ingest_routes(&db, &client, &date, page).await?;
            info!(date, stored, "Ingest finished");
        }
        Command::RefreshDetails { date } => {
            let updated = refresh_route_details(&db, &client, &date).await?;
            info!(date, updated, "Detail refresh finished");
        }
        Command::ExtractDispatches { route_key } => {
            let upserted = match route_key {
                Some(key) => extract_dispatches(&db, &key).await?,
                None => extract_open_routes(&db, None).await?,
            };
            info!(upserted, "Extraction finished");
        }
        Command::BackfillCarrier { route_key } => {
            let summary = backfill_carrier(&db, &scope(route_key)).await?;
            info!(?summary, "Carrier backfill finished");
        }
        Command::BackfillSubstatus { route_key } => {
            let summary = backfill_substatus(&db, &scope(route_key)).await?;
            info!(?summary, "Sub-status backfill finished");
        }
        Command::BackfillPromiseDate { route_key } => {
            let summary = backfill_promise_date(&db, &scope(route_key)).await?;
            info!(?summary, "Promise-date backfill finished");
        }
        Command::BackfillOrderType { route_key } => {
            let summary = backfill_order_type(&db, &scope(route_key)).await?;
            info!(?summary, "Order-type backfill finished");
        }
        Command::CloseRoutes { route_key } => {
            let closed = match route_key {
                Some(key) => evaluate_route_closure(&db, &key).await? as u64,
                None => close_finished_routes(&db, None).await?,
            };
            info!(closed, "Closure evaluation finished");
        }
        Command::UnfinishedRoutes => {
            let report = report_unfinished_routes(&db).await?;
            info!(
                dispatches = report.dispatches,
                route_keys = report.route_keys.len(),
                dispatch_dates = report.dispatch_dates.len(),
                "Unfinished-routes report"
            );
            println!("=== Distinct route_key with cierre != true ===");
            for key in &report.route_keys {
                println!("{key}");
            }
            println!("\n=== Distinct route_dispatch_date with cierre != true ===");
            for date in &report.dispatch_dates {
                println!("{date}");
            }
        }
        Command::Scheduler => {
            let handle = default_scheduler(db, client)?.start();
            wait_for_shutdown_signal().await;
            handle.shutdown().await;
        }
    }

    Ok(())
}

/// Block until SIGINT or SIGTERM.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C; shutting down"),
        _ = terminate => info!("Received SIGTERM; shutting down"),
    }
}
