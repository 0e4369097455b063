//! Legal Analysis Worker Service
//!
//! Accepts analysis triggers over HTTP, runs the document pipeline in the
//! background and embeds every completed document.
//!
//! ## Architecture
//!
//! ```text
//! POST /documents/{id}/analysis
//!   ↓ (202, run continues in background)
//! AnalysisDispatcher → AnalysisOrchestrator
//!   ↓ (claim, read upload, analyze, save)
//! PostgreSQL (documents, document_analysis)
//!   ↓ CompletionSignal
//! EmbeddingWorker
//!   ↓
//! PostgreSQL (document_embeddings)
//! ```
//!
//! ## Features
//!
//! - Per-operation timeouts and retries towards the inference service
//! - Bounded concurrency for analysis runs and embedding handlers
//! - Stale PROCESSING documents failed on startup
//! - Completed documents without an embedding re-queued on startup
//! - Graceful shutdown that drains queued and in-flight embeddings

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use core_config::{Environment, FromEnv, server::ServerConfig};
use database::postgres::{
    PostgresConfig, check_health, connect_from_config_with_retry, run_migrations,
};
use domain_analysis::{
    AnalysisDispatcher, AnalysisOrchestrator, AppState, BlobStore, DocumentRepository,
    EmbeddingRepository, EmbeddingWorker, InferenceApi, InferenceClient, InferenceConfig,
    LocalBlobStore, PgDocumentRepository, PgEmbeddingRepository, PgResultStore, PipelineConfig,
    ResultStore, SignalBus, StorageConfig, backfill_embeddings,
};
use eyre::{Result, WrapErr};
use migration::Migrator;
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info, warn};

const APP_NAME: &str = "legal-analysis-worker";

/// Message recorded on documents a previous process left in PROCESSING
const INTERRUPTED: &str = "interrupted: service restarted during analysis";

/// Readiness probe backed by a database round trip
async fn ready(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    match check_health(&db).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            error!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not ready" })),
            )
        }
    }
}

/// Domain routes plus `/ready`, wrapped in request tracing
pub fn build_router(state: AppState, db: DatabaseConnection) -> Router {
    domain_analysis::router(state)
        .merge(Router::new().route("/ready", get(ready)).with_state(db))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Run the worker
///
/// 1. Sets up color-eyre and structured logging (JSON for prod, pretty for dev)
/// 2. Loads configuration from the environment
/// 3. Connects to PostgreSQL and applies migrations
/// 4. Fails documents interrupted by a previous shutdown
/// 5. Starts the embedding worker and re-queues completed documents that
///    have no embedding yet
/// 6. Starts the HTTP server
/// 7. On SIGINT/SIGTERM stops accepting requests and drains the embedding worker
///
/// # Errors
///
/// Returns an error if configuration is invalid, the database is unreachable,
/// migrations fail or the HTTP listener cannot bind.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!(
        name = APP_NAME,
        version = env!("CARGO_PKG_VERSION"),
        environment = ?environment,
        "Starting legal analysis worker"
    );

    let server_config = ServerConfig::from_env().wrap_err("Failed to load server configuration")?;
    let pg_config = PostgresConfig::from_env().wrap_err("Failed to load PostgreSQL configuration")?;
    let inference_config =
        InferenceConfig::from_env().wrap_err("Failed to load inference configuration")?;
    let pipeline_config =
        PipelineConfig::from_env().wrap_err("Failed to load pipeline configuration")?;
    let storage_config =
        StorageConfig::from_env().wrap_err("Failed to load storage configuration")?;
    info!(
        inference_url = %inference_config.base_url,
        max_concurrent_analyses = pipeline_config.max_concurrent_analyses,
        max_concurrent_embeddings = pipeline_config.max_concurrent_embeddings,
        deadline_secs = pipeline_config.analysis_deadline.as_secs(),
        upload_dir = %storage_config.upload_dir.display(),
        "Configuration loaded"
    );

    info!("Connecting to PostgreSQL...");
    let db = connect_from_config_with_retry(pg_config, None)
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;
    run_migrations::<Migrator>(&db, APP_NAME)
        .await
        .wrap_err("Failed to run migrations")?;

    let documents: Arc<dyn DocumentRepository> = Arc::new(PgDocumentRepository::new(db.clone()));
    let results: Arc<dyn ResultStore> = Arc::new(PgResultStore::new(db.clone()));
    let embeddings: Arc<dyn EmbeddingRepository> =
        Arc::new(PgEmbeddingRepository::new(db.clone()));
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::from_config(&storage_config));
    let inference: Arc<dyn InferenceApi> = Arc::new(
        InferenceClient::new(inference_config).wrap_err("Failed to build inference client")?,
    );
    let signals = SignalBus::new();

    let interrupted = documents
        .fail_stale(INTERRUPTED)
        .await
        .wrap_err("Failed to recover interrupted documents")?;
    if interrupted > 0 {
        warn!(count = interrupted, "Marked interrupted analyses as failed");
    }

    if !inference.healthy().await {
        warn!("Inference service is not healthy yet, analyses will retry per call");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let embedding_worker = Arc::new(EmbeddingWorker::new(
        Arc::clone(&inference),
        embeddings.clone(),
        pipeline_config.max_concurrent_embeddings,
    ))
    .spawn(signals.subscribe(), shutdown_rx.clone());

    backfill_embeddings(documents.as_ref(), &signals)
        .await
        .wrap_err("Failed to re-queue documents missing an embedding")?;

    let orchestrator = AnalysisOrchestrator::new(
        documents.clone(),
        results.clone(),
        blobs.clone(),
        Arc::clone(&inference),
        signals,
    )
    .with_config(&pipeline_config);
    let dispatcher =
        AnalysisDispatcher::new(Arc::new(orchestrator), pipeline_config.max_concurrent_analyses);

    let app = build_router(
        AppState {
            dispatcher,
            documents,
            results,
            embeddings,
            blobs,
            inference,
        },
        db,
    );

    let address = server_config.address();
    let listener = TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("Failed to bind HTTP server to {address}"))?;
    info!(address = %address, "HTTP server listening");

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .wrap_err("HTTP server failed")?;

    info!("HTTP server stopped, draining embedding worker");
    embedding_worker
        .await
        .wrap_err("Embedding worker terminated abnormally")?;

    info!("Legal analysis worker stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }
}
