//! Collaborator seams: storage and external-pipeline traits.
//!
//! Every implementation must execute under the supplied [`AccessContext`];
//! the Postgres implementations bind the tenant onto the session for the
//! duration of each call, and in-memory test doubles filter by tenant.

use async_trait::async_trait;
use uuid::Uuid;

use crate::bundle::MetadataBundle;
use crate::error::Result;
use crate::models::{
    AccessContext, CreateJobRequest, ExtractionContext, JobRecord, QueuedJob, SuccessOutcome,
    VersionRecord, VersionSelector,
};

/// Job intake, lookup, and state-machine transitions.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job, or return the existing record when the dedup tuple
    /// (tenant, document, profile, ingestion fingerprint) already exists.
    /// Concurrent duplicate submissions are resolved transparently; this
    /// never fails on a duplicate.
    async fn create(&self, access: &AccessContext, req: &CreateJobRequest) -> Result<JobRecord>;

    /// Fetch a job by id within the tenant's scope.
    async fn get(&self, access: &AccessContext, job_id: Uuid) -> Result<Option<JobRecord>>;

    /// Cancel a job. Terminal statuses are idempotent no-ops returning the
    /// current record unchanged. `None` when the job is unknown.
    async fn cancel(&self, access: &AccessContext, job_id: Uuid) -> Result<Option<JobRecord>>;

    /// Claim up to `limit` queued jobs across tenants, most urgent first
    /// (lowest priority value, then oldest). Worker-role operation; each
    /// claimed job is then processed under its own tenant scope.
    async fn claim_queued(&self, limit: i64) -> Result<Vec<QueuedJob>>;

    /// Atomically transition `queued → running` and start a fresh attempt
    /// (sets `started_at`, clears prior error fields). Returns `None` when
    /// the job is missing, already running, or terminal.
    async fn begin_attempt(&self, access: &AccessContext, job_id: Uuid)
        -> Result<Option<JobRecord>>;

    /// Finalize a successful run: re-check cancellation, persist a new
    /// metadata version, and mark the job succeeded, all in one atomic
    /// unit. Cancellation always wins over a late success.
    async fn finish_success(
        &self,
        access: &AccessContext,
        job_id: Uuid,
        merged: &MetadataBundle,
        fingerprint: &str,
    ) -> Result<SuccessOutcome>;

    /// Finalize a failed run: terminal `failed`, error category + message
    /// recorded, retries incremented, `finished_at` set.
    async fn finish_failure(
        &self,
        access: &AccessContext,
        job_id: Uuid,
        error_type: &str,
        error_msg: &str,
    ) -> Result<()>;
}

/// Append-only, per-document, monotonically versioned metadata history.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Write an immutable version row with `version = max(existing) + 1`.
    /// The fingerprint is computed from the bundle when not supplied.
    async fn record_version(
        &self,
        access: &AccessContext,
        document_id: Uuid,
        metadata: &MetadataBundle,
        fingerprint: Option<&str>,
    ) -> Result<VersionRecord>;

    /// Fetch by selector; `None` when the document or the exact version
    /// does not exist.
    async fn fetch(
        &self,
        access: &AccessContext,
        document_id: Uuid,
        selector: VersionSelector,
    ) -> Result<Option<VersionRecord>>;

    /// Caller-initiated correction. Skips writing when the fingerprint
    /// equals the current latest version's, returning that version
    /// unchanged.
    async fn manual_update(
        &self,
        access: &AccessContext,
        document_id: Uuid,
        metadata: &MetadataBundle,
    ) -> Result<VersionRecord>;
}

/// The external extraction collaborator. A black box returning a bundle;
/// any error is captured into the job's `failed` bookkeeping.
#[async_trait]
pub trait ExtractionPipeline: Send + Sync {
    async fn invoke(&self, context: &ExtractionContext) -> Result<MetadataBundle>;
}

/// Best-effort search/index propagation. Failures are logged by the
/// caller and never block the primary success path.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn update(
        &self,
        access: &AccessContext,
        context: &ExtractionContext,
        document_id: Uuid,
        bundle: &MetadataBundle,
    ) -> Result<()>;
}
