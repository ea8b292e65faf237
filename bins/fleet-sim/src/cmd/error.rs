use ingest_api::ClientError;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
