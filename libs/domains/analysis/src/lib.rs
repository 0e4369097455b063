//! Legal Document Analysis Domain
//!
//! Analyzes uploaded legal documents with an external inference service and
//! stores the structured results and a summary embedding.
//!
//! # Architecture
//!
//! ```text
//! POST /documents/{id}/analysis
//!        │
//! ┌──────▼───────────┐
//! │ AnalysisDispatcher│  ← bounded background runs, awaitable handles
//! └──────┬───────────┘
//!        │
//! ┌──────▼────────────┐     ┌─────────────────┐
//! │AnalysisOrchestrator│ ──► │ InferenceClient │  ← per-operation timeout/retry
//! └──────┬────────────┘     └─────────────────┘
//!        │ claim → read blob → analyze → save
//! ┌──────▼──────┐
//! │ ResultStore │  ← analysis record + document completion
//! └──────┬──────┘
//!        │ CompletionSignal("Done")
//! ┌──────▼────────┐
//! │ EmbeddingWorker│  ← embed summary, upsert vector
//! └───────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_analysis::{
//!     AnalysisOrchestrator, InferenceClient, InferenceConfig, LocalBlobStore,
//!     PgDocumentRepository, PgResultStore, SignalBus,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(db: sea_orm::DatabaseConnection) -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = AnalysisOrchestrator::new(
//!     Arc::new(PgDocumentRepository::new(db.clone())),
//!     Arc::new(PgResultStore::new(db)),
//!     Arc::new(LocalBlobStore::new("./uploads")),
//!     Arc::new(InferenceClient::new(InferenceConfig::default())?),
//!     SignalBus::new(),
//! );
//! let document = orchestrator.run_analysis(uuid::Uuid::now_v7()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod embedding;
pub mod entity;
pub mod error;
pub mod events;
pub mod handlers;
pub mod inference;
pub mod memory;
pub mod models;
pub mod orchestrator;
pub mod postgres;
pub mod repository;
pub mod storage;
pub mod store;
pub mod text;

pub use config::PipelineConfig;
pub use dispatcher::{AnalysisDispatcher, AnalysisTask};
pub use embedding::{EmbeddingWorker, backfill_embeddings};
pub use error::{AnalysisError, AnalysisResult};
pub use events::{CompletionSignal, SignalBus};
pub use handlers::{AppState, router};
pub use inference::{
    AnalyzeRequest, InferenceApi, InferenceClient, InferenceConfig, InferenceError,
    InferenceResult, OperationPolicy,
};
pub use models::{
    AnalysisRecord, AnalysisResponse, Document, DocumentRef, Embedding, NewDocument,
    ProcessingStats, ProcessingStatus, RiskLevel, SummaryResult,
};
pub use orchestrator::AnalysisOrchestrator;
pub use postgres::{PgDocumentRepository, PgEmbeddingRepository, PgResultStore};
pub use repository::{BlobStore, DocumentRepository, EmbeddingRepository, ResultStore};
pub use storage::{LocalBlobStore, StorageConfig};
