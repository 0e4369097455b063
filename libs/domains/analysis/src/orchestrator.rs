use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::events::{CompletionSignal, SignalBus};
use crate::inference::{AnalyzeRequest, InferenceApi};
use crate::models::Document;
use crate::repository::{BlobStore, DocumentRepository, ResultStore};

/// Runs one document through read → analyze → persist → signal.
///
/// Per document, a run first claims the document (PENDING/FAILED →
/// PROCESSING); a second trigger for the same document is rejected until the
/// first one finishes. Any failure after the claim leaves the document
/// FAILED with the error message, and no completion signal is published.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    documents: Arc<dyn DocumentRepository>,
    results: Arc<dyn ResultStore>,
    blobs: Arc<dyn BlobStore>,
    inference: Arc<dyn InferenceApi>,
    signals: SignalBus,
    deadline: Duration,
    document_type: String,
}

impl AnalysisOrchestrator {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        results: Arc<dyn ResultStore>,
        blobs: Arc<dyn BlobStore>,
        inference: Arc<dyn InferenceApi>,
        signals: SignalBus,
    ) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            documents,
            results,
            blobs,
            inference,
            signals,
            deadline: defaults.analysis_deadline,
            document_type: defaults.document_type,
        }
    }

    pub fn with_config(mut self, config: &PipelineConfig) -> Self {
        self.deadline = config.analysis_deadline;
        self.document_type = config.document_type.clone();
        self
    }

    /// Analyze `document_id` and return the updated document.
    ///
    /// Returns `NotFound` for an unknown id and `AlreadyProcessing` when the
    /// claim is refused; neither writes anything.
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn run_analysis(&self, document_id: Uuid) -> AnalysisResult<Document> {
        let document = self
            .documents
            .get_by_id(document_id)
            .await?
            .ok_or(AnalysisError::NotFound(document_id))?;

        if !self.documents.try_claim(document_id).await? {
            warn!(
                status = %document.processing_status,
                "Document is not eligible for analysis, skipping"
            );
            return Err(AnalysisError::AlreadyProcessing(document_id));
        }

        info!(
            file_name = %document.file_name,
            content_type = %document.content_type,
            "Starting document analysis"
        );
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.deadline, self.process(&document)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AnalysisError::DeadlineExceeded(self.deadline)),
        };

        match outcome {
            Ok(updated) => {
                info!(
                    risk_level = ?updated.risk_level,
                    confidence = ?updated.analysis_confidence,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Document analysis completed"
                );
                self.signals.publish(CompletionSignal::done(updated.reference()));
                Ok(updated)
            }
            Err(e) => {
                error!(
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Document analysis failed"
                );
                self.mark_failed(document_id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn process(&self, document: &Document) -> AnalysisResult<Document> {
        let bytes = self.blobs.read(&document.file_path).await?;

        let response = self
            .inference
            .analyze(AnalyzeRequest {
                file_name: document.file_name.clone(),
                content_type: document.content_type.clone(),
                document_type: self.document_type.clone(),
                bytes,
            })
            .await?;

        self.results.save(document, &response).await
    }

    /// Record a failed run on the document. Errors here are logged, never returned.
    pub async fn mark_failed(&self, document_id: Uuid, message: &str) {
        match self.documents.mark_failed(document_id, message).await {
            Ok(true) => info!(document_id = %document_id, "Document marked as failed"),
            Ok(false) => warn!(
                document_id = %document_id,
                "Document disappeared before it could be marked as failed"
            ),
            Err(e) => error!(
                document_id = %document_id,
                error = %e,
                "Failed to mark document as failed"
            ),
        }
    }
}
