//! # mdex-db
//!
//! PostgreSQL storage layer for mdex.
//!
//! This crate provides:
//! - Connection pool management
//! - The job store (intake, state machine, success/failure finalization)
//! - The append-only metadata version history
//! - Search-index chunk metadata propagation
//! - Tenant-scoped sessions via `app.tenant_id` session settings
//!
//! ## Example
//!
//! ```rust,ignore
//! use mdex_db::Database;
//! use mdex_core::{AccessContext, JobStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/mdex").await?;
//!     db.migrate().await?;
//!
//!     let access = AccessContext::new(tenant_id, user_id);
//!     let job = db.jobs.create(&access, &request).await?;
//!     println!("queued job: {}", job.job_id);
//!     Ok(())
//! }
//! ```

pub mod index;
pub mod jobs;
pub mod pool;
pub mod tenant;
pub mod versions;

pub use index::PgSearchIndex;
pub use jobs::PgJobStore;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use versions::PgVersionStore;

use mdex_core::Result;

/// Aggregate handle bundling every repository over one shared pool.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Job intake and state machine.
    pub jobs: PgJobStore,
    /// Document metadata version history.
    pub versions: PgVersionStore,
    /// Search-index chunk metadata propagation.
    pub index: PgSearchIndex,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            jobs: PgJobStore::new(pool.clone()),
            versions: PgVersionStore::new(pool.clone()),
            index: PgSearchIndex::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = pool::create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = pool::create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run embedded migrations against the connected database.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| mdex_core::Error::Internal(format!("migration failed: {e}")))?;
        Ok(())
    }
}
