//! Core data model: job records, version records, contexts, DTOs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bundle::MetadataBundle;
use crate::defaults;
use crate::error::{Error, Result};

/// Fixed namespace for deriving deterministic document ids from a source
/// digest (UUIDv5). Repeated submissions of the same physical document
/// without an explicit id always target the same document.
pub const DOCUMENT_NAMESPACE: Uuid = Uuid::from_u128(0x6e14968a_5b92_4774_a1f0_655f4eca8ef8);

/// Status of an extraction job.
///
/// `queued → running → {succeeded, failed, canceled}`; the last three are
/// terminal sinks with no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl JobStatus {
    /// Stable string form used in the database and over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        }
    }

    /// Terminal statuses permit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            "canceled" => Ok(JobStatus::Canceled),
            other => Err(Error::Internal(format!("unknown job status: {other}"))),
        }
    }
}

/// Opaque payload needed to re-invoke the extraction pipeline for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionContext {
    /// Content digest of the source document (base64 SHA-256).
    pub digest: String,
    /// Collection the document's chunks live in.
    pub collection_name: String,
    /// Owning tenant.
    pub tenant_id: Uuid,
}

/// Tenant/user identity bound to every data-touching operation.
///
/// Passed explicitly through each function boundary so a missing scope is
/// a compile-time-visible omission, not a runtime forgetting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
}

impl AccessContext {
    pub fn new(tenant_id: Uuid, user_id: Uuid) -> Self {
        Self { tenant_id, user_id }
    }

    /// Scope for the background worker acting on a tenant's behalf; the
    /// nil user id marks actions not attributable to an end user.
    pub fn service(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            user_id: Uuid::nil(),
        }
    }
}

/// One unit of extraction work.
///
/// The tuple (tenant_id, document_id, profile, ingestion_fingerprint) is
/// unique; concurrent submissions with the same tuple resolve to the same
/// record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub tenant_id: Uuid,
    pub document_id: Uuid,
    pub profile: String,
    pub ingestion_fingerprint: String,
    pub status: JobStatus,
    pub priority: i32,
    pub retries: i32,
    pub error_type: Option<String>,
    pub error_msg: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Fingerprint of the bundle that produced the terminal success.
    pub processing_fingerprint: Option<String>,
    pub callback_url: Option<String>,
    pub idempotency_key: Option<String>,
    pub context: ExtractionContext,
    /// Caller-supplied seed bundle.
    pub input_metadata: Option<MetadataBundle>,
    /// Field names the pipeline may not overwrite.
    pub locked_fields: Vec<String>,
}

/// A claimed queued job: just enough identity for the worker to hand the
/// job to the runner under the right tenant scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedJob {
    pub job_id: Uuid,
    pub tenant_id: Uuid,
}

/// One immutable entry of a document's metadata history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub document_id: Uuid,
    /// 1-based, strictly increasing per document, no gaps.
    pub version: i32,
    /// Content hash of `payload`.
    pub fingerprint: String,
    pub extracted_on: DateTime<Utc>,
    pub payload: MetadataBundle,
}

/// Outcome of finalizing a successful run.
#[derive(Debug, Clone)]
pub enum SuccessOutcome {
    /// A new version was written and the job marked succeeded.
    Persisted(VersionRecord),
    /// The job was canceled while running; nothing was persisted.
    CanceledRace,
    /// The job disappeared before completion; nothing was persisted.
    Gone,
}

/// Client-specified pointer to a metadata version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    /// The version with the greatest integer.
    Latest,
    /// An explicit positive version number.
    Exact(i32),
}

impl FromStr for VersionSelector {
    type Err = Error;

    /// Accepts `latest` (or empty), `v<N>`, or a bare positive integer.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("latest") {
            return Ok(VersionSelector::Latest);
        }
        let digits = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        match digits.parse::<i32>() {
            Ok(n) if n >= 1 => Ok(VersionSelector::Exact(n)),
            _ => Err(Error::InvalidInput(format!(
                "invalid version selector: {s:?}"
            ))),
        }
    }
}

/// Intake request for creating (or idempotently resolving) a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    /// Explicit document id; when omitted, derived from the source digest.
    #[serde(default)]
    pub document_id: Option<Uuid>,
    pub context: ExtractionContext,
    /// Optional pre-filled seed bundle.
    #[serde(default)]
    pub metadata: Option<MetadataBundle>,
    /// Explicit lock list. `None` derives implicit locks from the seed
    /// bundle; `Some(vec![])` allows the pipeline to update everything.
    #[serde(default)]
    pub locked_fields: Option<Vec<String>>,
    /// Processing profile (selects extraction strategy).
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Lower value = more urgent.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Invoked after a successful extraction, best-effort.
    #[serde(default)]
    pub callback_url: Option<String>,
    /// Caller idempotency key; falls back to the source digest.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_priority() -> i32 {
    defaults::JOB_PRIORITY_DEFAULT
}

impl CreateJobRequest {
    /// Validate caller-controlled fields before touching any state.
    pub fn validate(&self) -> Result<()> {
        if self.priority < defaults::JOB_PRIORITY_MIN || self.priority > defaults::JOB_PRIORITY_MAX
        {
            return Err(Error::InvalidInput(format!(
                "priority must be between {} and {}",
                defaults::JOB_PRIORITY_MIN,
                defaults::JOB_PRIORITY_MAX
            )));
        }
        if let Some(key) = &self.idempotency_key {
            if key.is_empty() || key.len() > defaults::IDEMPOTENCY_KEY_MAX_LEN {
                return Err(Error::InvalidInput(format!(
                    "idempotency key must be 1..={} bytes",
                    defaults::IDEMPOTENCY_KEY_MAX_LEN
                )));
            }
        }
        if self.profile.is_empty() {
            return Err(Error::InvalidInput("profile must not be empty".to_string()));
        }
        Ok(())
    }

    /// The target document id: the explicit one, or UUIDv5 over
    /// [`DOCUMENT_NAMESPACE`] and the source digest.
    pub fn resolved_document_id(&self) -> Uuid {
        self.document_id
            .unwrap_or_else(|| Uuid::new_v5(&DOCUMENT_NAMESPACE, self.context.digest.as_bytes()))
    }

    /// The dedup-tuple fingerprint: the idempotency key when supplied,
    /// else the source content digest.
    pub fn ingestion_fingerprint(&self) -> String {
        self.idempotency_key
            .clone()
            .unwrap_or_else(|| self.context.digest.clone())
    }

    /// Locked-field policy: an explicit list wins (empty allowed);
    /// otherwise every non-null seed field is implicitly locked.
    pub fn effective_locked_fields(&self) -> Vec<String> {
        match &self.locked_fields {
            Some(explicit) => explicit.clone(),
            None => self
                .metadata
                .as_ref()
                .map(MetadataBundle::populated_fields)
                .unwrap_or_default(),
        }
    }
}
