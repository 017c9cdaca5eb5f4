//! # mdex-core
//!
//! Core types, traits, and the versioned-merge engine for mdex.
//!
//! This crate provides the foundational data structures and trait
//! definitions the storage, worker, and API crates depend on: the
//! metadata bundle value type with canonical fingerprinting, the merge
//! engine, the job/version data model, and the collaborator seams.

pub mod bundle;
pub mod config;
pub mod defaults;
pub mod error;
pub mod merge;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use bundle::{MetadataBundle, BUNDLE_FIELDS};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use merge::merge;
pub use models::{
    AccessContext, CreateJobRequest, ExtractionContext, JobRecord, JobStatus, QueuedJob,
    SuccessOutcome, VersionRecord, VersionSelector, DOCUMENT_NAMESPACE,
};
pub use traits::{ExtractionPipeline, JobStore, SearchIndex, VersionStore};
