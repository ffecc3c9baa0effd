//! Read-only reference mapping lookups.
//!
//! Both mappings are maintained outside this system; routesync only reads
//! them. The carrier mapping is keyed by an external id string; the
//! sub-status mapping is keyed by a code that the source stores
//! inconsistently as a string or a number, which is why lookups take the
//! full variant list produced by [`routesync_core::code_variants`].

use serde_json::Value as JsonValue;
use sqlx::PgPool;

use routesync_core::{Result, SubstatusMapping};

/// PostgreSQL repository for the reference mappings.
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    pool: PgPool,
}

impl ReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Authoritative carrier for an external id (`Id Externo` exact match).
    ///
    /// Returns the mapped `CT CORRESPONDE` value, which may itself be NULL
    /// in the mapping; empty-value handling is the caller's concern.
    pub async fn carrier_ct(&self, external_id: &str) -> Result<Option<String>> {
        let ct: Option<Option<String>> =
            sqlx::query_scalar("SELECT ct FROM carrier_map WHERE external_id = $1")
                .bind(external_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(ct.flatten())
    }

    /// Sub-status mapping row matching any representation of a code.
    pub async fn substatus_for_variants(
        &self,
        variants: &[JsonValue],
    ) -> Result<Option<SubstatusMapping>> {
        let mapping = sqlx::query_as::<_, SubstatusMapping>(
            "SELECT estado_beetrack, estado_guia, cierre FROM substatus_map \
             WHERE codigo_sub = ANY($1) LIMIT 1",
        )
        .bind(variants)
        .fetch_optional(&self.pool)
        .await?;
        Ok(mapping)
    }
}
