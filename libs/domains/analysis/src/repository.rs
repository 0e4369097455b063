use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AnalysisResult;
use crate::models::{
    AnalysisRecord, AnalysisResponse, Document, DocumentRef, Embedding, NewDocument,
    ProcessingStats,
};

/// Persistence of documents and their processing status
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Register an uploaded document in PENDING state
    async fn create(&self, input: NewDocument) -> AnalysisResult<Document>;

    async fn get_by_id(&self, id: Uuid) -> AnalysisResult<Option<Document>>;

    /// Atomically move the document from PENDING or FAILED to PROCESSING.
    ///
    /// Returns `false` when the document is missing or in any other state, in
    /// which case nothing was written.
    async fn try_claim(&self, id: Uuid) -> AnalysisResult<bool>;

    /// Set FAILED with `message` (cut to 500 characters). Returns `false` when
    /// the document no longer exists.
    async fn mark_failed(&self, id: Uuid, message: &str) -> AnalysisResult<bool>;

    /// Move every PROCESSING document to FAILED; returns how many moved
    async fn fail_stale(&self, message: &str) -> AnalysisResult<u64>;

    async fn stats(&self) -> AnalysisResult<ProcessingStats>;

    /// COMPLETED documents that have no stored embedding
    async fn completed_without_embedding(&self) -> AnalysisResult<Vec<DocumentRef>>;
}

/// Persistence of a completed analysis.
///
/// `save` writes the analysis record and the document completion in one
/// unit of work. A failed record write is logged and tolerated; a failed
/// document write is returned as [`crate::AnalysisError::Persistence`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save(
        &self,
        document: &Document,
        response: &AnalysisResponse,
    ) -> AnalysisResult<Document>;

    async fn get_by_document(&self, document_id: Uuid) -> AnalysisResult<Option<AnalysisRecord>>;
}

/// Persistence of document embeddings, one per document
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingRepository: Send + Sync {
    /// Insert or replace the embedding of `document_id`
    async fn upsert(&self, document_id: Uuid, vector: Vec<f32>) -> AnalysisResult<Embedding>;

    async fn get_by_document(&self, document_id: Uuid) -> AnalysisResult<Option<Embedding>>;
}

/// Read access to uploaded files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, locator: &str) -> AnalysisResult<Vec<u8>>;
}
