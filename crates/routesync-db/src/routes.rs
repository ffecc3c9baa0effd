//! Route repository.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use routesync_core::{Result, Route, RouteUpsert};

/// PostgreSQL repository for route records.
#[derive(Debug, Clone)]
pub struct RouteRepository {
    pool: PgPool,
}

impl RouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert one listing page of routes.
    ///
    /// Always refreshes `date`, `page`, `minified_raw`, and
    /// `last_refreshed_at`; the insert-only columns (`created_at`,
    /// `has_full_details`, `is_closed`) come from table defaults and are
    /// never part of the update, so re-ingesting an existing route cannot
    /// reset its closure state. Closed routes are immutable: the update arm
    /// is guarded with `WHERE NOT route.is_closed`.
    pub async fn upsert_page(&self, routes: &[RouteUpsert]) -> Result<u64> {
        if routes.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO route (route_key, date, page, minified_raw) ",
        );
        qb.push_values(routes, |mut b, r| {
            b.push_bind(&r.route_key)
                .push_bind(&r.date)
                .push_bind(r.page)
                .push_bind(&r.minified_raw);
        });
        qb.push(
            " ON CONFLICT (route_key) DO UPDATE SET \
               date = EXCLUDED.date, \
               page = EXCLUDED.page, \
               minified_raw = EXCLUDED.minified_raw, \
               last_refreshed_at = now() \
             WHERE NOT route.is_closed",
        );

        let result = qb.build().execute(&self.pool).await?;
        debug!(rows = result.rows_affected(), "Upserted route page");
        Ok(result.rows_affected())
    }

    /// Look up a route by its external key.
    pub async fn find_by_key(&self, route_key: &str) -> Result<Option<Route>> {
        let route = sqlx::query_as::<_, Route>(
            "SELECT id, route_key, date, page, minified_raw, full_raw, \
                    has_full_details, is_closed, closed_at, created_at, last_refreshed_at \
             FROM route WHERE route_key = $1",
        )
        .bind(route_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(route)
    }

    /// Keys of all open (not closed) routes, optionally restricted to a date.
    pub async fn open_keys(&self, date: Option<&str>) -> Result<Vec<String>> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT route_key FROM route WHERE NOT is_closed");
        if let Some(date) = date {
            qb.push(" AND date = ").push_bind(date);
        }
        qb.push(" ORDER BY route_key");

        let keys = qb.build_query_scalar::<String>().fetch_all(&self.pool).await?;
        Ok(keys)
    }

    /// Store the full detail payload for an open route.
    ///
    /// Returns false when the route is missing or already closed.
    pub async fn store_full_details(
        &self,
        route_key: &str,
        full_raw: &serde_json::Value,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE route SET full_raw = $2, has_full_details = TRUE, last_refreshed_at = now() \
             WHERE route_key = $1 AND NOT is_closed",
        )
        .bind(route_key)
        .bind(full_raw)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip a route to closed, exactly once.
    ///
    /// Returns true only for the run that actually performed the
    /// transition; a route that is already closed is left untouched.
    pub async fn mark_closed(&self, route_key: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE route SET is_closed = TRUE, closed_at = now() \
             WHERE route_key = $1 AND NOT is_closed",
        )
        .bind(route_key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
