//! Dispatch repository.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use routesync_core::{
    DispatchClosure, DispatchCode, DispatchTags, DispatchUpsert, Result, SubstatusMapping,
    UnfinishedDispatch,
};

/// Dispatch upserts are flushed in chunks of this size.
pub const UPSERT_BATCH_SIZE: usize = 500;

/// PostgreSQL repository for dispatch records.
#[derive(Debug, Clone)]
pub struct DispatchRepository {
    pool: PgPool,
}

impl DispatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a set of dispatches by their natural key, in chunks of
    /// [`UPSERT_BATCH_SIZE`].
    ///
    /// The update arm refreshes the route linkage, the raw payload, the
    /// flattened mirrors, and `last_refreshed_at`. It never touches the
    /// derived backfill fields (`ct`, `estado_*`, `cierre`, `promise_date*`,
    /// `tipo_orden`), and `created_at` plus the initially-NULL `ct` exist
    /// only through table defaults on first insert.
    pub async fn upsert_batch(&self, dispatches: &[DispatchUpsert]) -> Result<u64> {
        let mut total = 0u64;
        for chunk in dispatches.chunks(UPSERT_BATCH_SIZE) {
            total += self.upsert_chunk(chunk).await?;
        }
        Ok(total)
    }

    async fn upsert_chunk(&self, chunk: &[DispatchUpsert]) -> Result<u64> {
        if chunk.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO dispatch (dispatch_key, route_id, route_key, route_dispatch_date, \
             route_page, truck_identifier, dispatch_raw, status, status_id, substatus, \
             substatus_code, is_trunk, is_pickup, estimated_at, min_delivery_time, \
             max_delivery_time, delivery_time, beecode) ",
        );
        qb.push_values(chunk, |mut b, d| {
            b.push_bind(&d.dispatch_key)
                .push_bind(d.route_id)
                .push_bind(&d.route_key)
                .push_bind(&d.route_dispatch_date)
                .push_bind(d.route_page)
                .push_bind(&d.truck_identifier)
                .push_bind(&d.dispatch_raw)
                .push_bind(&d.status)
                .push_bind(d.status_id)
                .push_bind(&d.substatus)
                .push_bind(&d.substatus_code)
                .push_bind(d.is_trunk)
                .push_bind(d.is_pickup)
                .push_bind(&d.estimated_at)
                .push_bind(&d.min_delivery_time)
                .push_bind(&d.max_delivery_time)
                .push_bind(&d.delivery_time)
                .push_bind(&d.beecode);
        });
        qb.push(
            " ON CONFLICT (dispatch_key) DO UPDATE SET \
               route_id = EXCLUDED.route_id, \
               route_key = EXCLUDED.route_key, \
               route_dispatch_date = EXCLUDED.route_dispatch_date, \
               route_page = EXCLUDED.route_page, \
               truck_identifier = EXCLUDED.truck_identifier, \
               dispatch_raw = EXCLUDED.dispatch_raw, \
               status = EXCLUDED.status, \
               status_id = EXCLUDED.status_id, \
               substatus = EXCLUDED.substatus, \
               substatus_code = EXCLUDED.substatus_code, \
               is_trunk = EXCLUDED.is_trunk, \
               is_pickup = EXCLUDED.is_pickup, \
               estimated_at = EXCLUDED.estimated_at, \
               min_delivery_time = EXCLUDED.min_delivery_time, \
               max_delivery_time = EXCLUDED.max_delivery_time, \
               delivery_time = EXCLUDED.delivery_time, \
               beecode = EXCLUDED.beecode, \
               last_refreshed_at = now()",
        );

        let result = qb.build().execute(&self.pool).await?;
        debug!(rows = result.rows_affected(), "Upserted dispatch chunk");
        Ok(result.rows_affected())
    }

    /// Dispatches whose carrier code is still absent, with their tag lists.
    pub async fn missing_ct(&self, route_key: Option<&str>) -> Result<Vec<DispatchTags>> {
        self.scan_tags("ct", route_key).await
    }

    /// Dispatches whose promise date is still absent, with their tag lists.
    pub async fn missing_promise_date(
        &self,
        route_key: Option<&str>,
    ) -> Result<Vec<DispatchTags>> {
        self.scan_tags("promise_date", route_key).await
    }

    /// Dispatches whose order type is still absent, with their tag lists.
    pub async fn missing_tipo_orden(&self, route_key: Option<&str>) -> Result<Vec<DispatchTags>> {
        self.scan_tags("tipo_orden", route_key).await
    }

    // target_column is a compile-time literal from the callers above, never
    // user input.
    async fn scan_tags(
        &self,
        target_column: &str,
        route_key: Option<&str>,
    ) -> Result<Vec<DispatchTags>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, dispatch_key, dispatch_raw->'tags' AS tags FROM dispatch WHERE ",
        );
        qb.push(target_column).push(" IS NULL");
        if let Some(key) = route_key {
            qb.push(" AND route_key = ").push_bind(key);
        }

        let rows = qb
            .build_query_as::<DispatchTags>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// All dispatches in scope with their current sub-status code.
    ///
    /// The sub-status job re-derives its outputs on every run, so this scan
    /// has no "field absent" filter.
    pub async fn with_codes(&self, route_key: Option<&str>) -> Result<Vec<DispatchCode>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, dispatch_key, substatus_code FROM dispatch",
        );
        if let Some(key) = route_key {
            qb.push(" WHERE route_key = ").push_bind(key);
        }

        let rows = qb
            .build_query_as::<DispatchCode>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Set the resolved carrier code and the external id it matched on.
    pub async fn set_carrier(&self, id: Uuid, ct: &str, external_id: &str) -> Result<()> {
        sqlx::query("UPDATE dispatch SET ct = $2, ct_match_codcomu = $3 WHERE id = $1")
            .bind(id)
            .bind(ct)
            .bind(external_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Write all three sub-status outputs, nulls included.
    pub async fn set_substatus_fields(&self, id: Uuid, fields: &SubstatusMapping) -> Result<()> {
        sqlx::query(
            "UPDATE dispatch SET estado_beetrack = $2, estado_guia = $3, cierre = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&fields.estado_beetrack)
        .bind(&fields.estado_guia)
        .bind(fields.cierre)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Set the raw and normalized promise date.
    pub async fn set_promise_date(&self, id: Uuid, raw: &str, normalized: &str) -> Result<()> {
        sqlx::query(
            "UPDATE dispatch SET promise_date_raw = $2, promise_date = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(raw)
        .bind(normalized)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Set the order type.
    pub async fn set_tipo_orden(&self, id: Uuid, tipo_orden: &str) -> Result<()> {
        sqlx::query("UPDATE dispatch SET tipo_orden = $2 WHERE id = $1")
            .bind(id)
            .bind(tipo_orden)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Route linkage of every dispatch whose `cierre` is not strictly true.
    ///
    /// `IS DISTINCT FROM TRUE` so NULL and false both count as unfinished.
    pub async fn unfinished_rows(&self) -> Result<Vec<UnfinishedDispatch>> {
        let rows = sqlx::query_as::<_, UnfinishedDispatch>(
            "SELECT route_key, route_dispatch_date FROM dispatch \
             WHERE cierre IS DISTINCT FROM TRUE",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Terminal-state signal (`cierre`) for a set of dispatch keys.
    ///
    /// Keys with no stored dispatch are simply absent from the result.
    pub async fn closure_states(&self, keys: &[String]) -> Result<Vec<DispatchClosure>> {
        let rows = sqlx::query_as::<_, DispatchClosure>(
            "SELECT dispatch_key, cierre FROM dispatch WHERE dispatch_key = ANY($1)",
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_batch_size() {
        assert_eq!(UPSERT_BATCH_SIZE, 500);
    }

    #[test]
    fn test_chunking_covers_all_rows() {
        let rows: Vec<u32> = (0..1203).collect();
        let chunks: Vec<_> = rows.chunks(UPSERT_BATCH_SIZE).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 1203);
        assert_eq!(chunks[2].len(), 203);
    }
}
