//! Job repository implementation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mdex_core::{
    AccessContext, CreateJobRequest, Error, JobRecord, JobStatus, JobStore, MetadataBundle,
    QueuedJob, Result, SuccessOutcome,
};

use crate::tenant::begin_scoped;
use crate::versions::insert_version_in_tx;

/// Columns returned by every query that materializes a full [`JobRecord`].
const JOB_COLUMNS: &str = "job_id, tenant_id, document_id, profile, ingestion_fingerprint, \
     status, priority, retries, error_type, error_msg, created_at, started_at, finished_at, \
     processing_fingerprint, callback_url, idempotency_key, context, input_metadata, locked_fields";

/// PostgreSQL implementation of [`JobStore`].
pub struct PgJobStore {
    pool: Pool<Postgres>,
    /// Notify handle for event-driven worker wake.
    notify: Arc<Notify>,
}

impl PgJobStore {
    /// Create a new PgJobStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Create a new PgJobStore sharing an existing notify handle.
    pub fn with_notify(pool: Pool<Postgres>, notify: Arc<Notify>) -> Self {
        Self { pool, notify }
    }

    /// Get the job notification handle for event-driven waking.
    pub fn job_notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }

    /// Parse a job row into a [`JobRecord`].
    fn parse_job_row(row: sqlx::postgres::PgRow) -> Result<JobRecord> {
        let status: String = row.get("status");
        let context: JsonValue = row.get("context");
        let input_metadata: Option<JsonValue> = row.get("input_metadata");
        let locked_fields: JsonValue = row.get("locked_fields");

        Ok(JobRecord {
            job_id: row.get("job_id"),
            tenant_id: row.get("tenant_id"),
            document_id: row.get("document_id"),
            profile: row.get("profile"),
            ingestion_fingerprint: row.get("ingestion_fingerprint"),
            status: status.parse::<JobStatus>()?,
            priority: row.get("priority"),
            retries: row.get("retries"),
            error_type: row.get("error_type"),
            error_msg: row.get("error_msg"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            finished_at: row.get("finished_at"),
            processing_fingerprint: row.get("processing_fingerprint"),
            callback_url: row.get("callback_url"),
            idempotency_key: row.get("idempotency_key"),
            context: serde_json::from_value(context)?,
            input_metadata: input_metadata.map(serde_json::from_value).transpose()?,
            locked_fields: serde_json::from_value(locked_fields)?,
        })
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, access: &AccessContext, req: &CreateJobRequest) -> Result<JobRecord> {
        req.validate()?;

        let job_id = Uuid::new_v4();
        let document_id = req.resolved_document_id();
        let ingestion_fingerprint = req.ingestion_fingerprint();
        let locked_fields = req.effective_locked_fields();

        let mut tx = begin_scoped(&self.pool, access).await?;

        // ON CONFLICT DO NOTHING resolves concurrent duplicate submissions
        // without an error; the loser re-reads the winner's row.
        let insert = format!(
            "INSERT INTO metadata_jobs \
               (job_id, tenant_id, document_id, profile, ingestion_fingerprint, status, \
                priority, callback_url, idempotency_key, context, input_metadata, locked_fields) \
             VALUES ($1, $2, $3, $4, $5, 'queued', $6, $7, $8, $9, $10, $11) \
             ON CONFLICT ON CONSTRAINT uq_job_dedup DO NOTHING \
             RETURNING {JOB_COLUMNS}"
        );
        let inserted = sqlx::query(&insert)
            .bind(job_id)
            .bind(access.tenant_id)
            .bind(document_id)
            .bind(&req.profile)
            .bind(&ingestion_fingerprint)
            .bind(req.priority)
            .bind(&req.callback_url)
            .bind(&req.idempotency_key)
            .bind(serde_json::to_value(&req.context)?)
            .bind(req.metadata.as_ref().map(serde_json::to_value).transpose()?)
            .bind(serde_json::to_value(&locked_fields)?)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let (record, reused) = match inserted {
            Some(row) => (Self::parse_job_row(row)?, false),
            None => {
                let select = format!(
                    "SELECT {JOB_COLUMNS} FROM metadata_jobs \
                     WHERE tenant_id = $1 AND document_id = $2 AND profile = $3 \
                       AND ingestion_fingerprint = $4"
                );
                let row = sqlx::query(&select)
                    .bind(access.tenant_id)
                    .bind(document_id)
                    .bind(&req.profile)
                    .bind(&ingestion_fingerprint)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(Error::Database)?;
                (Self::parse_job_row(row)?, true)
            }
        };

        tx.commit().await.map_err(Error::Database)?;

        if reused {
            debug!(
                subsystem = "jobs",
                component = "store",
                op = "create",
                job_id = %record.job_id,
                document_id = %document_id,
                "Duplicate submission resolved to existing job"
            );
        } else {
            info!(
                subsystem = "jobs",
                component = "store",
                op = "create",
                job_id = %record.job_id,
                document_id = %document_id,
                profile = %record.profile,
                priority = record.priority,
                "Job queued"
            );
            self.notify.notify_waiters();
        }

        Ok(record)
    }

    async fn get(&self, access: &AccessContext, job_id: Uuid) -> Result<Option<JobRecord>> {
        let mut tx = begin_scoped(&self.pool, access).await?;
        let select =
            format!("SELECT {JOB_COLUMNS} FROM metadata_jobs WHERE job_id = $1 AND tenant_id = $2");
        let row = sqlx::query(&select)
            .bind(job_id)
            .bind(access.tenant_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn cancel(&self, access: &AccessContext, job_id: Uuid) -> Result<Option<JobRecord>> {
        let mut tx = begin_scoped(&self.pool, access).await?;

        let update = format!(
            "UPDATE metadata_jobs \
             SET status = 'canceled', finished_at = now() \
             WHERE job_id = $1 AND tenant_id = $2 AND status IN ('queued', 'running') \
             RETURNING {JOB_COLUMNS}"
        );
        let canceled = sqlx::query(&update)
            .bind(job_id)
            .bind(access.tenant_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let record = match canceled {
            Some(row) => {
                let record = Self::parse_job_row(row)?;
                info!(
                    subsystem = "jobs",
                    component = "store",
                    op = "cancel",
                    job_id = %job_id,
                    "Job canceled"
                );
                Some(record)
            }
            // Already terminal (idempotent no-op) or unknown; report current state.
            None => {
                let select = format!(
                    "SELECT {JOB_COLUMNS} FROM metadata_jobs WHERE job_id = $1 AND tenant_id = $2"
                );
                sqlx::query(&select)
                    .bind(job_id)
                    .bind(access.tenant_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(Error::Database)?
                    .map(Self::parse_job_row)
                    .transpose()?
            }
        };

        tx.commit().await.map_err(Error::Database)?;
        Ok(record)
    }

    async fn claim_queued(&self, limit: i64) -> Result<Vec<QueuedJob>> {
        // Worker-role scan across tenants. This does not transition state;
        // begin_attempt is the atomic gate, so a double claim is harmless.
        let rows = sqlx::query(
            "SELECT job_id, tenant_id FROM metadata_jobs \
             WHERE status = 'queued' \
             ORDER BY priority ASC, created_at ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| QueuedJob {
                job_id: row.get("job_id"),
                tenant_id: row.get("tenant_id"),
            })
            .collect())
    }

    async fn begin_attempt(
        &self,
        access: &AccessContext,
        job_id: Uuid,
    ) -> Result<Option<JobRecord>> {
        let mut tx = begin_scoped(&self.pool, access).await?;

        let update = format!(
            "UPDATE metadata_jobs \
             SET status = 'running', started_at = now(), error_type = NULL, error_msg = NULL \
             WHERE job_id = $1 AND tenant_id = $2 AND status = 'queued' \
             RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query(&update)
            .bind(job_id)
            .bind(access.tenant_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;

        match row {
            Some(row) => {
                debug!(
                    subsystem = "jobs",
                    component = "store",
                    op = "begin_attempt",
                    job_id = %job_id,
                    "Job transitioned to running"
                );
                Ok(Some(Self::parse_job_row(row)?))
            }
            None => Ok(None),
        }
    }

    async fn finish_success(
        &self,
        access: &AccessContext,
        job_id: Uuid,
        merged: &MetadataBundle,
        fingerprint: &str,
    ) -> Result<SuccessOutcome> {
        let mut tx = begin_scoped(&self.pool, access).await?;

        // Lock the row so a concurrent cancel serializes against us; the
        // status observed here is final for this transaction.
        let current = sqlx::query(
            "SELECT status, document_id FROM metadata_jobs \
             WHERE job_id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(job_id)
        .bind(access.tenant_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let Some(current) = current else {
            tx.commit().await.map_err(Error::Database)?;
            warn!(
                subsystem = "jobs",
                component = "store",
                op = "finish_success",
                job_id = %job_id,
                "Job disappeared before completion"
            );
            return Ok(SuccessOutcome::Gone);
        };

        let status: String = current.get("status");
        if status.parse::<JobStatus>()? == JobStatus::Canceled {
            // Cancellation wins; discard the late result entirely.
            tx.commit().await.map_err(Error::Database)?;
            info!(
                subsystem = "jobs",
                component = "store",
                op = "finish_success",
                job_id = %job_id,
                "Job canceled while running; result discarded"
            );
            return Ok(SuccessOutcome::CanceledRace);
        }

        let document_id: Uuid = current.get("document_id");
        let version =
            insert_version_in_tx(&mut tx, access.tenant_id, document_id, merged, fingerprint)
                .await?;

        sqlx::query(
            "UPDATE metadata_jobs \
             SET status = 'succeeded', finished_at = now(), processing_fingerprint = $3 \
             WHERE job_id = $1 AND tenant_id = $2",
        )
        .bind(job_id)
        .bind(access.tenant_id)
        .bind(fingerprint)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "jobs",
            component = "store",
            op = "finish_success",
            job_id = %job_id,
            document_id = %document_id,
            version = version.version,
            "Job succeeded; metadata version persisted"
        );
        Ok(SuccessOutcome::Persisted(version))
    }

    async fn finish_failure(
        &self,
        access: &AccessContext,
        job_id: Uuid,
        error_type: &str,
        error_msg: &str,
    ) -> Result<()> {
        let mut tx = begin_scoped(&self.pool, access).await?;

        let updated = sqlx::query(
            "UPDATE metadata_jobs \
             SET status = 'failed', finished_at = now(), retries = retries + 1, \
                 error_type = $3, error_msg = $4 \
             WHERE job_id = $1 AND tenant_id = $2 AND status = 'running'",
        )
        .bind(job_id)
        .bind(access.tenant_id)
        .bind(error_type)
        .bind(error_msg)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            // Terminal or unknown; failure bookkeeping must not clobber it.
            warn!(
                subsystem = "jobs",
                component = "store",
                op = "finish_failure",
                job_id = %job_id,
                "Job no longer running; failure not recorded"
            );
        } else {
            info!(
                subsystem = "jobs",
                component = "store",
                op = "finish_failure",
                job_id = %job_id,
                error_type = %error_type,
                "Job failed"
            );
        }
        Ok(())
    }
}
