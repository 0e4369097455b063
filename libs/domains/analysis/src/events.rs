use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

use crate::models::DocumentRef;

/// Status tag of a signal emitted after a successful analysis
pub const STATUS_DONE: &str = "Done";

/// Announces that a document's analysis has been persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSignal {
    pub status: String,
    pub document: DocumentRef,
    pub emitted_at: DateTime<Utc>,
}

impl CompletionSignal {
    pub fn done(document: DocumentRef) -> Self {
        Self {
            status: STATUS_DONE.to_string(),
            document,
            emitted_at: Utc::now(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == STATUS_DONE
    }
}

/// In-process fan-out of completion signals.
///
/// Every subscriber gets its own unbounded queue, so publishing never blocks
/// and a slow subscriber never loses signals. Subscribers whose receiver was
/// dropped are pruned on the next publish.
#[derive(Clone, Default)]
pub struct SignalBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<CompletionSignal>>>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<CompletionSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Deliver `signal` to every live subscriber; returns how many received it
    pub fn publish(&self, signal: CompletionSignal) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(signal.clone()).is_ok());

        debug!(
            document_id = %signal.document.id,
            status = %signal.status,
            subscribers = subscribers.len(),
            "Published completion signal"
        );
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<CompletionSignal>>> {
        // the guarded Vec stays consistent even if a holder panicked
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn signal() -> CompletionSignal {
        CompletionSignal::done(DocumentRef {
            id: Uuid::now_v7(),
            file_name: "nda.pdf".to_string(),
            summary: Some("Mutual NDA".to_string()),
        })
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_signal() {
        let bus = SignalBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        let sent = signal();

        assert_eq!(bus.publish(sent.clone()), 2);
        assert_eq!(a.recv().await.unwrap(), sent);
        assert_eq!(b.recv().await.unwrap(), sent);
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let bus = SignalBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());

        assert_eq!(bus.publish(signal()), 1);
        assert_eq!(bus.subscriber_count(), 1);
        drop(keep);
    }

    #[test]
    fn test_publish_without_subscribers() {
        assert_eq!(SignalBus::new().publish(signal()), 0);
    }

    #[test]
    fn test_done_signal() {
        let s = signal();
        assert!(s.is_done());
        assert_eq!(s.status, "Done");
    }
}
