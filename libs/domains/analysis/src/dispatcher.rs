use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::Document;
use crate::orchestrator::AnalysisOrchestrator;

/// Fires analysis runs in the background, at most `max_concurrent` at a time.
///
/// Submission never waits for the run; callers that care about the outcome
/// keep the returned [`AnalysisTask`].
#[derive(Clone)]
pub struct AnalysisDispatcher {
    orchestrator: Arc<AnalysisOrchestrator>,
    limit: Arc<Semaphore>,
}

/// Handle to one submitted analysis run
pub struct AnalysisTask {
    pub document_id: Uuid,
    handle: JoinHandle<AnalysisResult<Document>>,
}

impl AnalysisTask {
    /// Wait for the run to finish
    pub async fn wait(self) -> AnalysisResult<Document> {
        self.handle.await?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl AnalysisDispatcher {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, max_concurrent: usize) -> Self {
        Self {
            orchestrator,
            limit: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn submit_analysis(&self, document_id: Uuid) -> AnalysisTask {
        let orchestrator = Arc::clone(&self.orchestrator);
        let limit = Arc::clone(&self.limit);
        let span = tracing::info_span!("analysis_task", document_id = %document_id);

        let handle = tokio::spawn(
            async move {
                let _permit = limit
                    .acquire_owned()
                    .await
                    .map_err(|_| AnalysisError::Internal("analysis limiter closed".into()))?;
                debug!("Acquired analysis slot");
                orchestrator.run_analysis(document_id).await
            }
            .instrument(span),
        );

        AnalysisTask {
            document_id,
            handle,
        }
    }

    /// Slots free right now
    pub fn available_slots(&self) -> usize {
        self.limit.available_permits()
    }

    pub fn orchestrator(&self) -> &AnalysisOrchestrator {
        &self.orchestrator
    }
}
