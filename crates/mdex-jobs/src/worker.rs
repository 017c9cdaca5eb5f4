//! Worker loop: claims queued jobs and processes them concurrently.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::time::sleep;
use tracing::{debug, error, info};

use mdex_core::{defaults, JobStore, Result};

use crate::runner::JobRunner;

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of concurrent jobs.
    pub max_concurrent_jobs: usize,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            max_concurrent_jobs: defaults::JOB_MAX_CONCURRENT,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_MAX_CONCURRENT` | `4` | Max concurrent jobs |
    /// | `JOB_POLL_INTERVAL_MS` | `500` | Polling interval when queue is empty |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent_jobs = std::env::var("JOB_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::JOB_MAX_CONCURRENT)
            .max(1);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_POLL_INTERVAL_MS);

        Self {
            poll_interval_ms,
            max_concurrent_jobs,
            enabled,
        }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set maximum concurrent jobs.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| mdex_core::Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }
}

/// Job worker that claims and processes queued jobs.
pub struct JobWorker {
    jobs: Arc<dyn JobStore>,
    runner: Arc<JobRunner>,
    config: WorkerConfig,
    /// Woken on intake so an idle worker reacts without waiting out the
    /// poll interval.
    notify: Arc<Notify>,
}

impl JobWorker {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        runner: JobRunner,
        config: WorkerConfig,
        notify: Arc<Notify>,
    ) -> Self {
        Self {
            jobs,
            runner: Arc::new(runner),
            config,
            notify,
        }
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle { shutdown_tx }
    }

    /// Run the worker loop with concurrent job processing.
    ///
    /// Claims up to `max_concurrent_jobs` at a time and processes them
    /// concurrently. Only sleeps when the queue is empty.
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent_jobs,
            "Job worker started"
        );

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            // Check for shutdown before claiming jobs
            if shutdown_rx.try_recv().is_ok() {
                info!("Job worker received shutdown signal");
                break;
            }

            let claimed = match self
                .jobs
                .claim_queued(self.config.max_concurrent_jobs as i64)
                .await
            {
                Ok(jobs) => jobs,
                Err(e) => {
                    error!(error = ?e, "Failed to claim jobs");
                    Vec::new()
                }
            };

            if claimed.is_empty() {
                // Queue empty; wait for intake or the next poll tick.
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Job worker received shutdown signal");
                        break;
                    }
                    _ = self.notify.notified() => {}
                    _ = sleep(poll_interval) => {}
                }
                continue;
            }

            debug!(claimed = claimed.len(), "Processing concurrent job batch");

            let mut tasks = tokio::task::JoinSet::new();
            for job in claimed {
                let runner = self.runner.clone();
                tasks.spawn(async move {
                    if let Err(e) = runner.process(&job).await {
                        error!(
                            job_id = %job.job_id,
                            error = ?e,
                            "Job bookkeeping failed"
                        );
                    }
                });
            }

            // Wait for the batch, then immediately try to claim more.
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    error!(error = ?e, "Job task panicked");
                }
            }
        }

        info!("Job worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval_ms, defaults::JOB_POLL_INTERVAL_MS);
        assert_eq!(config.max_concurrent_jobs, defaults::JOB_MAX_CONCURRENT);
        assert!(config.enabled);
    }

    #[test]
    fn test_config_builder() {
        let config = WorkerConfig::default()
            .with_poll_interval(50)
            .with_max_concurrent(2)
            .with_enabled(false);
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.max_concurrent_jobs, 2);
        assert!(!config.enabled);
    }
}
