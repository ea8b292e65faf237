use ingest_api::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Очередь заполнена: задача отбрасывается (load shedding).
    #[error("queue full")]
    QueueFull,

    #[error("queue closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("config: {0}")]
    Config(String),

    #[error("transport connect: {0}")]
    Connect(#[source] ClientError),
}
