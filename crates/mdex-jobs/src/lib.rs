//! # mdex-jobs
//!
//! Background extraction worker for mdex.
//!
//! This crate provides:
//! - Priority-based claiming of queued extraction jobs
//! - The per-job choreography: attempt, extract, merge, finalize
//! - Concurrent processing with graceful shutdown
//! - Best-effort search-index propagation and completion callbacks
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mdex_jobs::{HttpExtractionPipeline, JobRunner, JobWorker, WorkerConfig};
//! use mdex_db::Database;
//!
//! let db = Database::connect("postgres://...").await?;
//! let notify = db.jobs.job_notify();
//! let jobs = Arc::new(db.jobs);
//!
//! let pipeline = Arc::new(HttpExtractionPipeline::new("http://extractor:9000")?);
//! let runner = JobRunner::new(jobs.clone(), pipeline, Arc::new(db.index))?;
//!
//! let handle = JobWorker::new(jobs, runner, WorkerConfig::from_env(), notify).start();
//!
//! // ... later
//! handle.shutdown().await?;
//! ```

pub mod callback;
pub mod pipeline;
pub mod runner;
pub mod worker;

pub use callback::{CallbackNotifier, CallbackPayload};
pub use pipeline::HttpExtractionPipeline;
pub use runner::JobRunner;
pub use worker::{JobWorker, WorkerConfig, WorkerHandle};
