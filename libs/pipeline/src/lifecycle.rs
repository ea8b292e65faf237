use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use ingest_api::{Delivery, TimeSeriesSink, Transport};

use crate::config::PipelineConfig;
use crate::ingress::Ingress;
use crate::queue::JobQueue;
use crate::sink::SinkAdapter;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::worker::WorkerPool;
use crate::PipelineError;

// ═══════════════════════════════════════════════════════════════
//  Lifecycle — startup / shutdown sequencing
// ═══════════════════════════════════════════════════════════════

/// Собирает конвейер и управляет порядком запуска и остановки.
///
/// Запуск: sink adapter → пул воркеров → connect → subscribe.
/// Остановка: cancel → disconnect(grace) → flush → close sink → join.
pub struct Lifecycle {
    config: PipelineConfig,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn TimeSeriesSink>,
}

impl Lifecycle {
    pub fn new(
        config: PipelineConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn TimeSeriesSink>,
    ) -> Self {
        Self { config, transport, sink }
    }

    /// Запустить конвейер.
    ///
    /// Ошибка connect фатальна: уже запущенные воркеры останавливаются,
    /// sink закрывается. Ошибка subscribe только логируется.
    pub async fn start(self) -> Result<Running, PipelineError> {
        let Self { config, transport, sink } = self;
        config.validate().map_err(PipelineError::Config)?;

        let sink = Arc::new(SinkAdapter::new(sink));
        let stats = Arc::new(PipelineStats::default());
        let queue = JobQueue::new(config.queue_size);
        let token = CancellationToken::new();
        let pool = WorkerPool::start(
            config.worker_count,
            queue.clone(),
            sink.clone(),
            stats.clone(),
            token.clone(),
        );

        if let Err(e) = transport.connect().await {
            tracing::error!(error = %e, "transport connect failed");
            token.cancel();
            pool.join().await;
            sink.close(config.flush_timeout).await;
            return Err(PipelineError::Connect(e));
        }
        tracing::info!("transport connected");

        let ingress: Arc<dyn Delivery> = Arc::new(Ingress::new(queue.clone(), stats.clone()));
        match transport.subscribe(&config.topic, ingress).await {
            Ok(()) => tracing::info!(topic = %config.topic, "subscribed"),
            Err(e) => tracing::error!(topic = %config.topic, error = %e, "subscribe failed"),
        }

        tracing::info!(
            workers = config.worker_count,
            queue_size = config.queue_size,
            "ingestor ready"
        );
        Ok(Running { config, transport, sink, queue, pool, stats, token })
    }

    /// start → ждать `shutdown` → остановка. Возвращает итоговые счётчики.
    pub async fn run<F>(self, shutdown: F) -> Result<StatsSnapshot, PipelineError>
    where
        F: Future<Output = ()>,
    {
        let running = self.start().await?;
        shutdown.await;
        Ok(running.shutdown().await)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Running
// ═══════════════════════════════════════════════════════════════

/// Запущенный конвейер.
pub struct Running {
    config: PipelineConfig,
    transport: Arc<dyn Transport>,
    sink: Arc<SinkAdapter>,
    queue: JobQueue,
    pool: WorkerPool,
    stats: Arc<PipelineStats>,
    token: CancellationToken,
}

impl Running {
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Остановить конвейер. Порядок шагов важен: flush идёт после
    /// disconnect, чтобы не потерять записи воркеров, ещё не заметивших
    /// отмену; join идёт после close.
    ///
    /// `flush_timeout` ограничивает и flush, и close: зависший sink не
    /// держит остановку дольше двух таких интервалов.
    pub async fn shutdown(self) -> StatsSnapshot {
        tracing::info!("shutting down");

        self.token.cancel();
        tracing::info!("workers cancelled");

        self.transport.disconnect(self.config.disconnect_grace).await;
        tracing::info!("transport disconnected");

        let timeout_ms = self.config.flush_timeout.map(|t| t.as_millis() as u64);
        if self.sink.flush(self.config.flush_timeout).await {
            tracing::info!("sink flushed");
        } else {
            tracing::error!(timeout_ms, "sink flush timed out");
        }
        if self.sink.close(self.config.flush_timeout).await {
            tracing::info!("sink closed");
        } else {
            tracing::error!(timeout_ms, "sink close timed out");
        }

        self.pool.join().await;
        tracing::info!("workers joined");
        self.queue.close();

        let stats = self.stats.snapshot();
        tracing::info!(
            accepted = stats.accepted,
            dropped = stats.dropped,
            decoded = stats.decoded,
            rejected = stats.rejected,
            alerts = stats.alerts,
            abandoned = self.queue.len(),
            "offline"
        );
        stats
    }
}
