//! Search-index metadata propagation.
//!
//! After a successful extraction the document's chunk rows get the fresh
//! bundle merged into their `meta` JSONB and their tag list replaced.
//! This path is best-effort by contract; callers log and move on when it
//! fails.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use sqlx::{Pool, Postgres};
use tracing::debug;
use uuid::Uuid;

use mdex_core::{AccessContext, Error, ExtractionContext, MetadataBundle, Result, SearchIndex};

use crate::tenant::begin_scoped;

/// PostgreSQL implementation of [`SearchIndex`].
pub struct PgSearchIndex {
    pool: Pool<Postgres>,
}

impl PgSearchIndex {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Bundle as a JSON object with null fields dropped; chunk `meta` only
    /// carries values, absence means unknown.
    fn meta_object(bundle: &MetadataBundle) -> Result<JsonValue> {
        let value = serde_json::to_value(bundle)?;
        let map = match value {
            JsonValue::Object(map) => map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .collect::<Map<String, JsonValue>>(),
            _ => Map::new(),
        };
        Ok(JsonValue::Object(map))
    }
}

#[async_trait]
impl SearchIndex for PgSearchIndex {
    async fn update(
        &self,
        access: &AccessContext,
        context: &ExtractionContext,
        document_id: Uuid,
        bundle: &MetadataBundle,
    ) -> Result<()> {
        let meta = Self::meta_object(bundle)?;
        let tags = serde_json::to_value(bundle.tags.clone().unwrap_or_default())?;

        let mut tx = begin_scoped(&self.pool, access).await?;

        let updated = sqlx::query(
            "UPDATE index_chunks \
             SET meta = COALESCE(meta, '{}'::jsonb) || $1::jsonb, tags = $2::jsonb \
             WHERE document_id = $3 \
               AND collection_id = ( \
                   SELECT collection_id FROM index_collections \
                   WHERE name = $4 AND tenant_id = $5 \
               )",
        )
        .bind(&meta)
        .bind(&tags)
        .bind(document_id)
        .bind(&context.collection_name)
        .bind(access.tenant_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "index",
            component = "chunks",
            op = "update",
            document_id = %document_id,
            collection = %context.collection_name,
            chunks = updated.rows_affected(),
            "Chunk metadata refreshed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_object_drops_nulls() {
        let bundle = MetadataBundle {
            company_name: Some("ACME AG".to_string()),
            tags: Some(vec!["annual".to_string()]),
            ..Default::default()
        };
        let meta = PgSearchIndex::meta_object(&bundle).unwrap();
        let obj = meta.as_object().unwrap();
        assert_eq!(obj.get("company_name").unwrap(), "ACME AG");
        assert!(!obj.contains_key("document_type"));
        assert!(!obj.contains_key("reporting_date"));
    }
}
