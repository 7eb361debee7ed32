//! Attraction name lookups against the catalog table.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use ticketgate_core::result::AppResult;
use ticketgate_core::types::AttractionId;

use crate::error::map_sqlx_error;
use crate::store::AttractionDirectory;

/// [`AttractionDirectory`] over the `attractions` table.
#[derive(Debug, Clone)]
pub struct PgAttractionDirectory {
    pool: PgPool,
}

impl PgAttractionDirectory {
    /// Create a new attraction directory.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttractionDirectory for PgAttractionDirectory {
    async fn names(&self, ids: &[AttractionId]) -> AppResult<HashMap<AttractionId, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();

        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, name FROM attractions WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to load attraction names", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| (AttractionId::from_uuid(id), name))
            .collect())
    }
}
