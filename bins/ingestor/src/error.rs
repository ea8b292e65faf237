#[derive(Debug, thiserror::Error)]
pub enum IngestorError {
    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Client(#[from] ingest_api::ClientError),

    #[error("{0}")]
    Pipeline(#[from] pipeline::PipelineError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
