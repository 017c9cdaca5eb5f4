//! mdex-api - HTTP API server for mdex

mod auth;
mod dto;
mod error;
mod handlers;

use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use mdex_core::AppConfig;
use mdex_db::{Database, PgJobStore};
use mdex_jobs::{HttpExtractionPipeline, JobRunner, JobWorker, WorkerConfig};

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub public_base_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mdex_api=debug,mdex_db=debug,mdex_jobs=debug,tower_http=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let db = Arc::new(Database::connect(&config.database_url).await?);
    db.migrate().await?;

    // The worker shares the intake notify handle so an enqueue wakes an
    // idle loop immediately.
    let worker_handle = match &config.pipeline_url {
        Some(url) => {
            let notify = db.jobs.job_notify();
            let jobs: Arc<dyn mdex_core::JobStore> =
                Arc::new(PgJobStore::with_notify(db.pool.clone(), notify.clone()));
            let pipeline = Arc::new(HttpExtractionPipeline::new(url.clone())?);
            let index = Arc::new(mdex_db::PgSearchIndex::new(db.pool.clone()));
            let runner = JobRunner::new(jobs.clone(), pipeline, index)?;
            Some(JobWorker::new(jobs, runner, WorkerConfig::from_env(), notify).start())
        }
        None => {
            warn!("MDEX_PIPELINE_URL not set; extraction worker disabled");
            None
        }
    };

    let state = AppState {
        db,
        public_base_url: config.public_base_url.clone(),
    };

    let app = Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/v1/metadata", post(handlers::create_job))
        .route(
            "/v1/documents/:document_id/rebuild",
            post(handlers::rebuild_document),
        )
        .route("/v1/jobs/:job_id", get(handlers::get_job))
        .route("/v1/jobs/:job_id", delete(handlers::cancel_job))
        .route(
            "/v1/documents/:document_id/metadata",
            get(handlers::get_metadata),
        )
        .route(
            "/v1/documents/:document_id/metadata",
            put(handlers::put_metadata),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]),
        )
        .with_state(state);

    info!(addr = %config.bind_addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = worker_handle {
        handle.shutdown().await.ok();
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
