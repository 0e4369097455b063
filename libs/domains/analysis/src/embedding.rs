use std::sync::Arc;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{AnalysisError, AnalysisResult};
use crate::events::{CompletionSignal, SignalBus};
use crate::inference::InferenceApi;
use crate::models::Embedding;
use crate::repository::{DocumentRepository, EmbeddingRepository};

/// Turns completion signals into stored document embeddings.
///
/// Handlers run concurrently, bounded by a semaphore. A failed embedding is
/// logged and dropped: the document stays COMPLETED without an embedding.
pub struct EmbeddingWorker {
    inference: Arc<dyn InferenceApi>,
    embeddings: Arc<dyn EmbeddingRepository>,
    limit: Arc<Semaphore>,
}

impl EmbeddingWorker {
    pub fn new(
        inference: Arc<dyn InferenceApi>,
        embeddings: Arc<dyn EmbeddingRepository>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            inference,
            embeddings,
            limit: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Embed the document named by `signal`. Signals other than `Done` are ignored.
    #[instrument(skip(self, signal), fields(document_id = %signal.document.id))]
    pub async fn on_signal(&self, signal: &CompletionSignal) -> AnalysisResult<Option<Embedding>> {
        if !signal.is_done() {
            debug!(status = %signal.status, "Ignoring completion signal");
            return Ok(None);
        }

        let vector = self.inference.embed(signal.document.summary.clone()).await?;
        let embedding = self.embeddings.upsert(signal.document.id, vector).await?;

        info!(
            dimensions = embedding.vector.len(),
            "Stored document embedding"
        );
        Ok(Some(embedding))
    }

    /// Run `on_signal` and log the outcome
    pub async fn handle(&self, signal: CompletionSignal) {
        if let Err(e) = self.on_signal(&signal).await {
            error!(
                document_id = %signal.document.id,
                file_name = %signal.document.file_name,
                error = %e,
                "Failed to embed document"
            );
        }
    }

    /// Spawn a handler for `signal` once a permit is free. Returns `false` when
    /// the semaphore was closed and the signal dropped.
    async fn dispatch(self: &Arc<Self>, in_flight: &mut JoinSet<()>, signal: CompletionSignal) -> bool {
        let permit = match Arc::clone(&self.limit).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(document_id = %signal.document.id, "Embedding semaphore closed, dropping signal");
                return false;
            }
        };
        let worker = Arc::clone(self);
        in_flight.spawn(async move {
            worker.handle(signal).await;
            drop(permit);
        });
        true
    }

    /// Consume `signals` until the channel closes or `shutdown` flips to true.
    ///
    /// On shutdown the channel is closed and whatever is still queued gets
    /// handled before the worker waits for in-flight handlers.
    pub async fn run(
        self: Arc<Self>,
        mut signals: mpsc::UnboundedReceiver<CompletionSignal>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut in_flight: JoinSet<()> = JoinSet::new();
        info!(
            max_concurrent = self.limit.available_permits(),
            "Embedding worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                received = signals.recv() => {
                    let Some(signal) = received else {
                        debug!("Signal channel closed");
                        break;
                    };
                    if !self.dispatch(&mut in_flight, signal).await {
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Received shutdown signal, stopping embedding worker");
                        break;
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_join(joined);
                }
            }
        }

        // signals queued before shutdown are still embedded
        signals.close();
        while let Some(signal) = signals.recv().await {
            if !self.dispatch(&mut in_flight, signal).await {
                break;
            }
        }

        if !in_flight.is_empty() {
            info!(pending = in_flight.len(), "Waiting for in-flight embeddings");
        }
        while let Some(joined) = in_flight.join_next().await {
            log_join(joined);
        }
        info!("Embedding worker stopped");
    }

    /// Spawn [`run`](Self::run) on the runtime
    pub fn spawn(
        self: Arc<Self>,
        signals: mpsc::UnboundedReceiver<CompletionSignal>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(signals, shutdown))
    }
}

/// Republish a `Done` signal for every COMPLETED document without an
/// embedding, e.g. after a shutdown interrupted the embedding step.
/// Returns how many documents were queued.
pub async fn backfill_embeddings(
    documents: &dyn DocumentRepository,
    signals: &SignalBus,
) -> AnalysisResult<usize> {
    let missing = documents.completed_without_embedding().await?;
    for document in &missing {
        signals.publish(CompletionSignal::done(document.clone()));
    }
    if !missing.is_empty() {
        info!(count = missing.len(), "Queued documents missing an embedding");
    }
    Ok(missing.len())
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %AnalysisError::from(e), "Embedding task aborted");
    }
}
