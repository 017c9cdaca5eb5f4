//! HTTP contract operations.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

use mdex_core::{
    defaults, Error, JobStore, MetadataBundle, VersionSelector, VersionStore,
};

use crate::auth::Caller;
use crate::dto::{
    IntakeRequest, JobCancelResponse, JobCreatedResponse, JobStatusResponse,
    MetadataVersionResponse,
};
use crate::error::ApiError;
use crate::AppState;

/// Submit a document for metadata extraction.
///
/// Idempotent on the dedup tuple; resubmitting the same document/profile/
/// fingerprint returns the existing job. With `wait_for_secs` the response
/// blocks (bounded) and carries a result link when the job finishes in time.
pub async fn create_job(
    State(state): State<AppState>,
    Caller(access): Caller,
    Json(req): Json<IntakeRequest>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
    if req.job.context.tenant_id != access.tenant_id {
        return Err(ApiError::Forbidden(
            "request context tenant does not match the authenticated tenant".to_string(),
        ));
    }

    let record = state.db.jobs.create(&access, &req.job).await?;
    let record = match req.wait_for_secs {
        Some(secs) if secs > 0 => wait_for_completion(&state, &access, record, secs).await?,
        _ => record,
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(JobCreatedResponse::from_record(&record, &state.public_base_url)),
    ))
}

/// Re-run extraction for a known document. Same intake path; the path
/// segment overrides any document id in the body.
pub async fn rebuild_document(
    State(state): State<AppState>,
    Caller(access): Caller,
    Path(document_id): Path<Uuid>,
    Json(mut req): Json<IntakeRequest>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
    if req.job.context.tenant_id != access.tenant_id {
        return Err(ApiError::Forbidden(
            "request context tenant does not match the authenticated tenant".to_string(),
        ));
    }

    req.job.document_id = Some(document_id);
    let record = state.db.jobs.create(&access, &req.job).await?;

    info!(
        subsystem = "api",
        component = "handlers",
        op = "rebuild",
        document_id = %document_id,
        job_id = %record.job_id,
        "Rebuild requested"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(JobCreatedResponse::from_record(&record, &state.public_base_url)),
    ))
}

pub async fn get_job(
    State(state): State<AppState>,
    Caller(access): Caller,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let record = state
        .db
        .jobs
        .get(&access, job_id)
        .await?
        .ok_or(Error::JobNotFound(job_id))?;
    Ok(Json(JobStatusResponse::from_record(
        record,
        &state.public_base_url,
    )))
}

/// Cancel a job. Terminal jobs are unaffected and report their current
/// status; the operation is idempotent.
pub async fn cancel_job(
    State(state): State<AppState>,
    Caller(access): Caller,
    Path(job_id): Path<Uuid>,
) -> Result<(StatusCode, Json<JobCancelResponse>), ApiError> {
    let record = state
        .db
        .jobs
        .cancel(&access, job_id)
        .await?
        .ok_or(Error::JobNotFound(job_id))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(JobCancelResponse {
            job_id: record.job_id,
            status: record.status,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    /// `latest` (default), `v<N>`, or a bare version number.
    #[serde(default)]
    pub version: Option<String>,
}

pub async fn get_metadata(
    State(state): State<AppState>,
    Caller(access): Caller,
    Path(document_id): Path<Uuid>,
    Query(query): Query<VersionQuery>,
) -> Result<Json<MetadataVersionResponse>, ApiError> {
    let selector = match query.version.as_deref() {
        None => VersionSelector::Latest,
        Some(raw) => raw.parse::<VersionSelector>()?,
    };

    let record = state
        .db
        .versions
        .fetch(&access, document_id, selector)
        .await?
        .ok_or(Error::MetadataNotFound(document_id))?;
    Ok(Json(record.into()))
}

/// Caller-initiated metadata correction. Writes the next version, unless
/// the submitted bundle fingerprints identically to the current latest,
/// in which case that version is returned unchanged.
pub async fn put_metadata(
    State(state): State<AppState>,
    Caller(access): Caller,
    Path(document_id): Path<Uuid>,
    Json(bundle): Json<MetadataBundle>,
) -> Result<Json<MetadataVersionResponse>, ApiError> {
    let record = state
        .db
        .versions
        .manual_update(&access, document_id, &bundle)
        .await?;
    Ok(Json(record.into()))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Poll the job until it reaches a terminal status or the window closes.
/// The window is capped; callers cannot hold a connection indefinitely.
async fn wait_for_completion(
    state: &AppState,
    access: &mdex_core::AccessContext,
    record: mdex_core::JobRecord,
    secs: u64,
) -> Result<mdex_core::JobRecord, ApiError> {
    let capped = secs.min(defaults::INTAKE_WAIT_MAX_SECS);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(capped);
    let poll = Duration::from_millis(defaults::INTAKE_WAIT_POLL_MS);
    let job_id = record.job_id;

    let mut current = record;
    while !current.status.is_terminal() && tokio::time::Instant::now() < deadline {
        sleep(poll).await;
        if let Some(fresh) = state.db.jobs.get(access, job_id).await? {
            current = fresh;
        } else {
            break;
        }
    }

    debug!(
        subsystem = "api",
        component = "handlers",
        op = "intake_wait",
        job_id = %job_id,
        status = %current.status,
        waited_secs = capped,
        "Intake wait finished"
    );
    Ok(current)
}
