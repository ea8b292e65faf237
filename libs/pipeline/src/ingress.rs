use std::sync::Arc;

use ingest_api::Delivery;

use crate::queue::{Job, JobQueue};
use crate::stats::PipelineStats;
use crate::QueueError;

// ═══════════════════════════════════════════════════════════════
//  Ingress — transport callback → JobQueue
// ═══════════════════════════════════════════════════════════════

/// Callback доставки, который транспорт вызывает на каждое сообщение.
///
/// Никогда не блокирует поток транспорта: задача либо сразу ложится в
/// очередь, либо отбрасывается с предупреждением.
pub struct Ingress {
    queue: JobQueue,
    stats: Arc<PipelineStats>,
}

impl Ingress {
    pub fn new(queue: JobQueue, stats: Arc<PipelineStats>) -> Self {
        Self { queue, stats }
    }
}

impl Delivery for Ingress {
    fn deliver(&self, topic: &str, payload: Vec<u8>) {
        match self.queue.try_enqueue(Job::new(topic, payload)) {
            Ok(()) => self.stats.record_accepted(),
            Err(QueueError::QueueFull) => {
                let dropped = self.stats.record_dropped();
                tracing::warn!(%topic, dropped, "queue full, dropping packet");
            }
            Err(QueueError::Closed) => {
                tracing::debug!(%topic, "queue closed, ignoring packet");
            }
        }
    }
}
