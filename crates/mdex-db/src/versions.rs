//! Append-only metadata version history.
//!
//! Versions are 1-based and strictly increasing per document. Assignment
//! takes a transaction-scoped advisory lock on the document id so two
//! concurrent writers cannot compute the same `max(version) + 1`; the
//! `(document_id, version)` primary key is the backstop.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use mdex_core::{
    AccessContext, Error, MetadataBundle, Result, VersionRecord, VersionSelector, VersionStore,
};

use crate::tenant::begin_scoped;

const VERSION_COLUMNS: &str = "document_id, version, fingerprint, extracted_on, payload";

fn parse_version_row(row: sqlx::postgres::PgRow) -> Result<VersionRecord> {
    let payload: JsonValue = row.get("payload");
    Ok(VersionRecord {
        document_id: row.get("document_id"),
        version: row.get("version"),
        fingerprint: row.get("fingerprint"),
        extracted_on: row.get("extracted_on"),
        payload: serde_json::from_value(payload)?,
    })
}

/// Serialize the advisory lock on one document's version sequence for the
/// remainder of the transaction.
async fn lock_document(tx: &mut Transaction<'_, Postgres>, document_id: Uuid) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(document_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

/// Insert the next version row inside an already-open transaction.
///
/// Shared with the job store so a successful run persists its version in
/// the same atomic unit as the `succeeded` transition.
pub(crate) async fn insert_version_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    document_id: Uuid,
    metadata: &MetadataBundle,
    fingerprint: &str,
) -> Result<VersionRecord> {
    lock_document(tx, document_id).await?;

    let insert = format!(
        "INSERT INTO document_metadata (tenant_id, document_id, version, fingerprint, payload) \
         SELECT $1, $2, COALESCE(MAX(version), 0) + 1, $3, $4 \
         FROM document_metadata WHERE document_id = $2 \
         RETURNING {VERSION_COLUMNS}"
    );
    let row = sqlx::query(&insert)
        .bind(tenant_id)
        .bind(document_id)
        .bind(fingerprint)
        .bind(serde_json::to_value(metadata)?)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

    parse_version_row(row)
}

/// PostgreSQL implementation of [`VersionStore`].
pub struct PgVersionStore {
    pool: Pool<Postgres>,
}

impl PgVersionStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_latest_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<VersionRecord>> {
        let select = format!(
            "SELECT {VERSION_COLUMNS} FROM document_metadata \
             WHERE document_id = $1 AND tenant_id = $2 \
             ORDER BY version DESC LIMIT 1"
        );
        sqlx::query(&select)
            .bind(document_id)
            .bind(tenant_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .map(parse_version_row)
            .transpose()
    }
}

#[async_trait]
impl VersionStore for PgVersionStore {
    async fn record_version(
        &self,
        access: &AccessContext,
        document_id: Uuid,
        metadata: &MetadataBundle,
        fingerprint: Option<&str>,
    ) -> Result<VersionRecord> {
        let computed;
        let fingerprint = match fingerprint {
            Some(fp) => fp,
            None => {
                computed = metadata.fingerprint()?;
                &computed
            }
        };

        let mut tx = begin_scoped(&self.pool, access).await?;
        let record =
            insert_version_in_tx(&mut tx, access.tenant_id, document_id, metadata, fingerprint)
                .await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "versions",
            component = "store",
            op = "record",
            document_id = %document_id,
            version = record.version,
            "Metadata version recorded"
        );
        Ok(record)
    }

    async fn fetch(
        &self,
        access: &AccessContext,
        document_id: Uuid,
        selector: VersionSelector,
    ) -> Result<Option<VersionRecord>> {
        let mut tx = begin_scoped(&self.pool, access).await?;

        let record = match selector {
            VersionSelector::Latest => {
                Self::fetch_latest_in_tx(&mut tx, access.tenant_id, document_id).await?
            }
            VersionSelector::Exact(n) => {
                let select = format!(
                    "SELECT {VERSION_COLUMNS} FROM document_metadata \
                     WHERE document_id = $1 AND tenant_id = $2 AND version = $3"
                );
                sqlx::query(&select)
                    .bind(document_id)
                    .bind(access.tenant_id)
                    .bind(n)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(Error::Database)?
                    .map(parse_version_row)
                    .transpose()?
            }
        };

        tx.commit().await.map_err(Error::Database)?;
        Ok(record)
    }

    async fn manual_update(
        &self,
        access: &AccessContext,
        document_id: Uuid,
        metadata: &MetadataBundle,
    ) -> Result<VersionRecord> {
        let fingerprint = metadata.fingerprint()?;
        let mut tx = begin_scoped(&self.pool, access).await?;

        // Lock first so latest-check and insert see a stable sequence.
        lock_document(&mut tx, document_id).await?;

        if let Some(latest) =
            Self::fetch_latest_in_tx(&mut tx, access.tenant_id, document_id).await?
        {
            if latest.fingerprint == fingerprint {
                tx.commit().await.map_err(Error::Database)?;
                debug!(
                    subsystem = "versions",
                    component = "store",
                    op = "manual_update",
                    document_id = %document_id,
                    version = latest.version,
                    "Identical fingerprint; no new version written"
                );
                return Ok(latest);
            }
        }

        let record =
            insert_version_in_tx(&mut tx, access.tenant_id, document_id, metadata, &fingerprint)
                .await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "versions",
            component = "store",
            op = "manual_update",
            document_id = %document_id,
            version = record.version,
            "Manual metadata version recorded"
        );
        Ok(record)
    }
}
