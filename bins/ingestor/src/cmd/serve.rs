use std::sync::Arc;

use ingest_api::{TimeSeriesSink, Transport};
use pipeline::Lifecycle;
use storage_influxdb::InfluxSink;
use transport_mqtt::MqttTransport;

use crate::config::Effective;
use crate::error::IngestorError;

pub async fn run(eff: Effective) -> Result<(), IngestorError> {
    tracing::info!(
        broker = %format!("{}:{}", eff.mqtt.host, eff.mqtt.port),
        topic = %eff.pipeline.topic,
        workers = eff.pipeline.worker_count,
        queue_size = eff.pipeline.queue_size,
        "starting ingestor"
    );

    let sink: Arc<dyn TimeSeriesSink> = Arc::new(InfluxSink::new(eff.influx)?);
    let transport: Arc<dyn Transport> = Arc::new(MqttTransport::new(eff.mqtt));

    // Обработчики ставятся до старта, чтобы ошибка установки была видна сразу.
    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let shutdown = async move {
        #[cfg(unix)]
        tokio::select! {
            r = tokio::signal::ctrl_c() => {
                if let Err(e) = r {
                    tracing::error!(error = %e, "ctrl-c handler failed");
                }
            }
            _ = terminate.recv() => {}
        }
        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "ctrl-c handler failed");
            }
        }
        tracing::info!("termination signal received");
    };

    let stats = Lifecycle::new(eff.pipeline, transport, sink).run(shutdown).await?;
    tracing::info!(dropped = stats.dropped, decoded = stats.decoded, "shutdown complete");
    Ok(())
}
