//! In-memory implementations of the repository traits, for tests and local runs

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{
    AnalysisRecord, AnalysisResponse, Document, DocumentRef, Embedding, NewDocument,
    ProcessingStats, ProcessingStatus,
};
use crate::repository::{BlobStore, DocumentRepository, EmbeddingRepository, ResultStore};
use crate::store::{build_completion, build_record};

/// Documents kept in a shared map.
///
/// Embedding lookups go to the linked embedding repository; a repository
/// built with [`new`](Self::new) sees an empty one.
#[derive(Clone, Default)]
pub struct InMemoryDocumentRepository {
    documents: Arc<RwLock<HashMap<Uuid, Document>>>,
    embeddings: InMemoryEmbeddingRepository,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embeddings(embeddings: InMemoryEmbeddingRepository) -> Self {
        Self {
            documents: Arc::default(),
            embeddings,
        }
    }

    /// Store `document` as-is, replacing any document with the same id
    pub async fn insert(&self, document: Document) {
        self.documents.write().await.insert(document.id, document);
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn create(&self, input: NewDocument) -> AnalysisResult<Document> {
        let now = Utc::now();
        let document = Document {
            id: Uuid::now_v7(),
            file_name: input.file_name,
            file_path: input.file_path,
            file_size: input.file_size,
            content_type: input.content_type,
            processing_status: ProcessingStatus::Pending,
            summary: None,
            summary_generated_at: None,
            analysis_confidence: None,
            risk_level: None,
            processing_error: None,
            created_at: now,
            updated_at: now,
        };

        self.documents
            .write()
            .await
            .insert(document.id, document.clone());
        info!(document_id = %document.id, "Registered document");
        Ok(document)
    }

    async fn get_by_id(&self, id: Uuid) -> AnalysisResult<Option<Document>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn try_claim(&self, id: Uuid) -> AnalysisResult<bool> {
        let mut documents = self.documents.write().await;
        match documents.get_mut(&id) {
            Some(doc) if doc.processing_status.is_claimable() => {
                doc.processing_status = ProcessingStatus::Processing;
                doc.processing_error = None;
                doc.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_failed(&self, id: Uuid, message: &str) -> AnalysisResult<bool> {
        let mut documents = self.documents.write().await;
        match documents.get_mut(&id) {
            Some(doc) => {
                doc.fail(message);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fail_stale(&self, message: &str) -> AnalysisResult<u64> {
        let mut documents = self.documents.write().await;
        let mut moved = 0;
        for doc in documents
            .values_mut()
            .filter(|d| d.processing_status == ProcessingStatus::Processing)
        {
            doc.fail(message);
            moved += 1;
        }
        Ok(moved)
    }

    async fn stats(&self) -> AnalysisResult<ProcessingStats> {
        let mut stats = ProcessingStats::default();
        for doc in self.documents.read().await.values() {
            stats.record(doc.processing_status, 1);
        }
        Ok(stats)
    }

    async fn completed_without_embedding(&self) -> AnalysisResult<Vec<DocumentRef>> {
        let embedded = self.embeddings.embeddings.read().await;
        Ok(self
            .documents
            .read()
            .await
            .values()
            .filter(|d| d.processing_status == ProcessingStatus::Completed)
            .filter(|d| !embedded.contains_key(&d.id))
            .map(Document::reference)
            .collect())
    }
}

/// Result store sharing its documents with an [`InMemoryDocumentRepository`].
///
/// The two `fail_*` switches inject write failures so callers can exercise
/// the partial-persistence paths.
#[derive(Clone)]
pub struct InMemoryResultStore {
    documents: InMemoryDocumentRepository,
    records: Arc<RwLock<HashMap<Uuid, AnalysisRecord>>>,
    fail_record_writes: Arc<AtomicBool>,
    fail_document_writes: Arc<AtomicBool>,
}

impl InMemoryResultStore {
    pub fn new(documents: InMemoryDocumentRepository) -> Self {
        Self {
            documents,
            records: Arc::new(RwLock::new(HashMap::new())),
            fail_record_writes: Arc::new(AtomicBool::new(false)),
            fail_document_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_record_writes(&self, fail: bool) {
        self.fail_record_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_document_writes(&self, fail: bool) {
        self.fail_document_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn save(
        &self,
        document: &Document,
        response: &AnalysisResponse,
    ) -> AnalysisResult<Document> {
        let now = Utc::now();
        let record = if self.fail_record_writes.load(Ordering::SeqCst) {
            warn!(document_id = %document.id, "Analysis record write failed, continuing with document update");
            None
        } else {
            Some(build_record(document.id, response, now))
        };

        let mut documents = self.documents.documents.write().await;
        if self.fail_document_writes.load(Ordering::SeqCst) {
            return Err(AnalysisError::Persistence(format!(
                "document {} could not be updated",
                document.id
            )));
        }
        let stored = documents.get_mut(&document.id).ok_or_else(|| {
            AnalysisError::Persistence(format!("document {} no longer exists", document.id))
        })?;
        stored.complete(&build_completion(response, now));
        let updated = stored.clone();
        drop(documents);

        if let Some(record) = record {
            self.records.write().await.insert(document.id, record);
        }
        Ok(updated)
    }

    async fn get_by_document(&self, document_id: Uuid) -> AnalysisResult<Option<AnalysisRecord>> {
        Ok(self.records.read().await.get(&document_id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEmbeddingRepository {
    embeddings: Arc<RwLock<HashMap<Uuid, Embedding>>>,
}

impl InMemoryEmbeddingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.embeddings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EmbeddingRepository for InMemoryEmbeddingRepository {
    async fn upsert(&self, document_id: Uuid, vector: Vec<f32>) -> AnalysisResult<Embedding> {
        let embedding = Embedding {
            id: Uuid::now_v7(),
            document_id,
            vector,
            created_at: Utc::now(),
        };
        self.embeddings
            .write()
            .await
            .insert(document_id, embedding.clone());
        Ok(embedding)
    }

    async fn get_by_document(&self, document_id: Uuid) -> AnalysisResult<Option<Embedding>> {
        Ok(self.embeddings.read().await.get(&document_id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, locator: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs.write().await.insert(locator.into(), bytes.into());
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn read(&self, locator: &str) -> AnalysisResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(locator)
            .cloned()
            .ok_or_else(|| AnalysisError::Storage(format!("blob not found: {locator}")))
    }
}
