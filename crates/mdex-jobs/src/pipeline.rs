//! Extraction pipeline client.
//!
//! The pipeline is an external HTTP service that reads a document (located
//! by digest within a collection) and returns a metadata bundle. It is a
//! black box; any failure surfaces as an extraction error on the job.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info};

use mdex_core::{Error, ExtractionContext, ExtractionPipeline, MetadataBundle, Result};

/// Default end-to-end timeout for one extraction call.
const EXTRACTION_TIMEOUT_SECS: u64 = 300;

/// HTTP client for the extraction service.
pub struct HttpExtractionPipeline {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExtractionPipeline {
    /// Create a client against the given base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EXTRACTION_TIMEOUT_SECS))
            .build()
            .map_err(Error::from)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ExtractionPipeline for HttpExtractionPipeline {
    async fn invoke(&self, context: &ExtractionContext) -> Result<MetadataBundle> {
        let start = Instant::now();
        let url = format!("{}/extract", self.base_url);

        debug!(
            subsystem = "pipeline",
            component = "http",
            op = "invoke",
            digest = %context.digest,
            collection = %context.collection_name,
            "Requesting extraction"
        );

        let response = self
            .client
            .post(&url)
            .json(context)
            .send()
            .await
            .map_err(Error::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Extraction(format!(
                "extraction service returned {status}: {body}"
            )));
        }

        let bundle: MetadataBundle = response.json().await.map_err(Error::from)?;

        info!(
            subsystem = "pipeline",
            component = "http",
            op = "invoke",
            digest = %context.digest,
            fields = bundle.populated_fields().len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Extraction completed"
        );
        Ok(bundle)
    }
}
