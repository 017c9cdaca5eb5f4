//! Single-job processing choreography.
//!
//! A claimed job runs through: atomic `queued → running` transition,
//! pipeline invocation, deterministic merge against the seed bundle and
//! its locked fields, then atomic success finalization (cancel re-check +
//! version write + `succeeded` in one unit). Search-index propagation and
//! the completion callback run after the transaction and never affect the
//! outcome.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use mdex_core::{
    merge, AccessContext, ExtractionPipeline, JobRecord, JobStore, MetadataBundle, QueuedJob,
    Result, SearchIndex, SuccessOutcome,
};

use crate::callback::{CallbackNotifier, CallbackPayload};

/// Processes one claimed job end to end.
pub struct JobRunner {
    jobs: Arc<dyn JobStore>,
    pipeline: Arc<dyn ExtractionPipeline>,
    index: Arc<dyn SearchIndex>,
    notifier: CallbackNotifier,
}

impl JobRunner {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        pipeline: Arc<dyn ExtractionPipeline>,
        index: Arc<dyn SearchIndex>,
    ) -> Result<Self> {
        Ok(Self {
            jobs,
            pipeline,
            index,
            notifier: CallbackNotifier::new()?,
        })
    }

    /// Run one claimed job. Any failure after the attempt starts — the
    /// pipeline, the merge, or the success finalization itself — is
    /// recorded as terminal `failed` on the job; the job is never left
    /// `running` after this returns. Only a store too broken to record
    /// the failure propagates an error.
    pub async fn process(&self, claimed: &QueuedJob) -> Result<()> {
        let start = Instant::now();
        let access = AccessContext::service(claimed.tenant_id);

        let Some(job) = self.jobs.begin_attempt(&access, claimed.job_id).await? else {
            // Canceled, already picked up elsewhere, or gone. Not an error.
            debug!(
                subsystem = "jobs",
                component = "runner",
                op = "process",
                job_id = %claimed.job_id,
                "Job no longer queued; skipping"
            );
            return Ok(());
        };

        info!(
            subsystem = "jobs",
            component = "runner",
            op = "process",
            job_id = %job.job_id,
            document_id = %job.document_id,
            profile = %job.profile,
            "Processing job"
        );

        let (outcome, merged, fingerprint) = match self.run_attempt(&access, &job).await {
            Ok(finished) => finished,
            Err(e) => {
                warn!(
                    subsystem = "jobs",
                    component = "runner",
                    op = "process",
                    job_id = %job.job_id,
                    error_type = e.category(),
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job failed"
                );
                if let Err(record_err) = self
                    .jobs
                    .finish_failure(&access, job.job_id, e.category(), &e.to_string())
                    .await
                {
                    error!(
                        subsystem = "jobs",
                        component = "runner",
                        op = "process",
                        job_id = %job.job_id,
                        error = %record_err,
                        "Failed to record job failure"
                    );
                    return Err(record_err);
                }
                return Ok(());
            }
        };

        match outcome {
            SuccessOutcome::Persisted(version) => {
                info!(
                    subsystem = "jobs",
                    component = "runner",
                    op = "process",
                    job_id = %job.job_id,
                    document_id = %job.document_id,
                    version = version.version,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job succeeded"
                );
                self.propagate(&access, &job, &merged).await;
                if let Some(url) = &job.callback_url {
                    let payload = CallbackPayload {
                        job_id: job.job_id,
                        document_id: job.document_id,
                        status: mdex_core::JobStatus::Succeeded,
                        version: version.version,
                        fingerprint,
                    };
                    self.notifier.notify(url, &payload).await;
                }
            }
            SuccessOutcome::CanceledRace | SuccessOutcome::Gone => {
                // Finalization already logged the reason; nothing persisted.
            }
        }

        Ok(())
    }

    /// Extract, merge under the job's lock list, fingerprint, and
    /// finalize. Grouped so every failing step funnels into the same
    /// terminal-failure bookkeeping in [`Self::process`].
    async fn run_attempt(
        &self,
        access: &AccessContext,
        job: &JobRecord,
    ) -> Result<(SuccessOutcome, MetadataBundle, String)> {
        let generated = self.pipeline.invoke(&job.context).await?;
        let merged = merge(
            job.input_metadata.as_ref(),
            Some(&generated),
            &job.locked_fields,
        )?;
        let fingerprint = merged.fingerprint()?;
        let outcome = self
            .jobs
            .finish_success(access, job.job_id, &merged, &fingerprint)
            .await?;
        Ok((outcome, merged, fingerprint))
    }

    /// Best-effort search-index propagation.
    async fn propagate(&self, access: &AccessContext, job: &JobRecord, merged: &MetadataBundle) {
        if let Err(e) = self
            .index
            .update(access, &job.context, job.document_id, merged)
            .await
        {
            warn!(
                subsystem = "jobs",
                component = "runner",
                op = "propagate",
                job_id = %job.job_id,
                document_id = %job.document_id,
                error = %e,
                "Search-index propagation failed; job outcome unaffected"
            );
        }
    }
}
