//! Response shapes for the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mdex_core::{CreateJobRequest, JobRecord, JobStatus, MetadataBundle, VersionRecord};

/// Intake body: the job request plus API-level options.
#[derive(Debug, Clone, Deserialize)]
pub struct IntakeRequest {
    #[serde(flatten)]
    pub job: CreateJobRequest,
    /// Block up to this many seconds waiting for completion (capped).
    #[serde(default)]
    pub wait_for_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct JobCreatedResponse {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub status: JobStatus,
    pub status_url: String,
    /// Present when the job completed within the intake wait window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub profile: String,
    pub status: JobStatus,
    pub priority: i32,
    pub retries: i32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobCancelResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct MetadataVersionResponse {
    pub document_id: Uuid,
    pub version: i32,
    pub fingerprint: String,
    pub extracted_on: DateTime<Utc>,
    pub metadata: MetadataBundle,
}

pub fn status_url(base: &str, job_id: Uuid) -> String {
    format!("{base}/v1/jobs/{job_id}")
}

pub fn result_url(base: &str, document_id: Uuid) -> String {
    format!("{base}/v1/documents/{document_id}/metadata?version=latest")
}

impl JobCreatedResponse {
    pub fn from_record(record: &JobRecord, base: &str) -> Self {
        let result_url = (record.status == JobStatus::Succeeded)
            .then(|| result_url(base, record.document_id));
        Self {
            job_id: record.job_id,
            document_id: record.document_id,
            status: record.status,
            status_url: status_url(base, record.job_id),
            result_url,
        }
    }
}

impl JobStatusResponse {
    pub fn from_record(record: JobRecord, base: &str) -> Self {
        let result_url = (record.status == JobStatus::Succeeded)
            .then(|| result_url(base, record.document_id));
        Self {
            job_id: record.job_id,
            document_id: record.document_id,
            profile: record.profile,
            status: record.status,
            priority: record.priority,
            retries: record.retries,
            created_at: record.created_at,
            started_at: record.started_at,
            finished_at: record.finished_at,
            error_type: record.error_type,
            error_msg: record.error_msg,
            processing_fingerprint: record.processing_fingerprint,
            result_url,
        }
    }
}

impl From<VersionRecord> for MetadataVersionResponse {
    fn from(record: VersionRecord) -> Self {
        Self {
            document_id: record.document_id,
            version: record.version,
            fingerprint: record.fingerprint,
            extracted_on: record.extracted_on,
            metadata: record.payload,
        }
    }
}
