use async_channel::{Receiver, Sender, TrySendError};
use tokio_util::sync::CancellationToken;

use crate::QueueError;

// ═══════════════════════════════════════════════════════════════
//  Job
// ═══════════════════════════════════════════════════════════════

/// Одно входящее сообщение транспорта.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Job {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self { topic: topic.into(), payload: payload.into() }
    }
}

// ═══════════════════════════════════════════════════════════════
//  JobQueue — bounded MPMC FIFO
// ═══════════════════════════════════════════════════════════════

/// Ограниченная очередь задач: один писатель (ingress), много читателей
/// (воркеры).
///
/// Запись никогда не блокирует: при заполнении задача не попадает в
/// очередь вовсе. Каждая принятая задача достаётся ровно одному воркеру.
#[derive(Clone)]
pub struct JobQueue {
    tx: Sender<Job>,
    rx: Receiver<Job>,
}

impl JobQueue {
    /// `capacity` должна быть не меньше 1 (проверяется в `PipelineConfig`).
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        Self { tx, rx }
    }

    /// Неблокирующая постановка в очередь.
    pub fn try_enqueue(&self, job: Job) -> Result<(), QueueError> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(QueueError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// Ждать задачу либо отмену.
    ///
    /// Отмена проверяется первой: после `token.cancel()` ни одна новая задача
    /// не выдаётся, даже если в очереди что-то осталось. None также
    /// возвращается, когда очередь закрыта и пуста.
    pub async fn dequeue(&self, token: &CancellationToken) -> Option<Job> {
        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            job = self.rx.recv() => job.ok(),
        }
    }

    /// Закрыть очередь для записи. Оставшиеся задачи ещё можно забрать.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_enqueue_fails_when_capacity_is_one() {
        let q = JobQueue::new(1);
        assert_eq!(q.try_enqueue(Job::new("fleet/1/telemetry", vec![1])), Ok(()));
        assert_eq!(
            q.try_enqueue(Job::new("fleet/1/telemetry", vec![2])),
            Err(QueueError::QueueFull)
        );
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn never_exceeds_capacity() {
        let q = JobQueue::new(8);
        let accepted = (0..1000u32)
            .filter(|i| q.try_enqueue(Job::new("t", i.to_be_bytes().to_vec())).is_ok())
            .count();
        assert_eq!(accepted, 8);
        assert_eq!(q.len(), 8);
    }

    #[tokio::test]
    async fn dequeue_is_fifo() {
        let q = JobQueue::new(4);
        let token = CancellationToken::new();
        for i in 0..3u8 {
            q.try_enqueue(Job::new("t", vec![i])).unwrap();
        }
        for i in 0..3u8 {
            assert_eq!(q.dequeue(&token).await.unwrap().payload, vec![i]);
        }
        assert_eq!(q.len(), 0);
    }

    #[tokio::test]
    async fn cancellation_wins_over_queued_items() {
        let q = JobQueue::new(4);
        q.try_enqueue(Job::new("t", vec![1])).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(q.dequeue(&token).await, None);
        // Задача осталась в очереди.
        assert_eq!(q.len(), 1);
    }

    #[tokio::test]
    async fn blocked_dequeue_wakes_on_cancel() {
        let q = JobQueue::new(4);
        let token = CancellationToken::new();
        let waiter = {
            let q = q.clone();
            let token = token.clone();
            tokio::spawn(async move { q.dequeue(&token).await })
        };
        tokio::task::yield_now().await;
        token.cancel();
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn closed_queue_drains_then_ends() {
        let q = JobQueue::new(4);
        let token = CancellationToken::new();
        q.try_enqueue(Job::new("t", vec![7])).unwrap();
        q.close();
        assert_eq!(q.try_enqueue(Job::new("t", vec![8])), Err(QueueError::Closed));
        assert_eq!(q.dequeue(&token).await.map(|j| j.payload), Some(vec![7]));
        assert_eq!(q.dequeue(&token).await, None);
    }
}
