//! Completion callbacks.
//!
//! When a job carries a `callback_url`, the worker POSTs a small JSON
//! notification after the job reaches a terminal success. Delivery is
//! best-effort: failures are logged and never affect the job outcome.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use mdex_core::{Error, JobStatus, Result};

const CALLBACK_TIMEOUT_SECS: u64 = 10;

/// Payload delivered to the caller's callback endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackPayload {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub status: JobStatus,
    pub version: i32,
    pub fingerprint: String,
}

/// Fire-and-forget HTTP notifier.
pub struct CallbackNotifier {
    client: reqwest::Client,
}

impl CallbackNotifier {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(CALLBACK_TIMEOUT_SECS))
            .build()
            .map_err(Error::from)?;
        Ok(Self { client })
    }

    /// Deliver the payload, logging rather than propagating failures.
    pub async fn notify(&self, url: &str, payload: &CallbackPayload) {
        match self.client.post(url).json(payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(
                    subsystem = "jobs",
                    component = "callback",
                    job_id = %payload.job_id,
                    url = %url,
                    "Callback delivered"
                );
            }
            Ok(response) => {
                warn!(
                    subsystem = "jobs",
                    component = "callback",
                    job_id = %payload.job_id,
                    url = %url,
                    status = %response.status(),
                    "Callback endpoint returned an error"
                );
            }
            Err(e) => {
                warn!(
                    subsystem = "jobs",
                    component = "callback",
                    job_id = %payload.job_id,
                    url = %url,
                    error = %e,
                    "Callback delivery failed"
                );
            }
        }
    }
}
