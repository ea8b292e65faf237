//! Конвейер ингестии: transport → ingress → очередь → пул воркеров →
//! декодер → sink.
//!
//! Ingress никогда не блокирует транспорт: при переполнении очереди новые
//! сообщения отбрасываются. Остановка проходит через [`Running::shutdown`],
//! который соблюдает порядок cancel → disconnect → flush → close → join.

pub mod config;
pub mod error;
mod ingress;
mod lifecycle;
mod queue;
mod sink;
mod stats;
mod worker;

#[cfg(test)]
mod testing;

pub use config::PipelineConfig;
pub use error::{PipelineError, QueueError};
pub use ingress::Ingress;
pub use lifecycle::{Lifecycle, Running};
pub use queue::{Job, JobQueue};
pub use sink::{MEASUREMENT, SinkAdapter, record_to_point};
pub use stats::{PipelineStats, StatsSnapshot};
pub use worker::{JobOutcome, WorkerPool, process_job};
