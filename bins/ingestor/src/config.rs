use std::time::Duration;

use clap::{Args, Parser, ValueEnum};

use pipeline::PipelineConfig;
use pipeline::config::{DEFAULT_QUEUE_SIZE, DEFAULT_TOPIC, DEFAULT_WORKER_COUNT};
use storage_influxdb::{DEFAULT_BATCH_SIZE, DEFAULT_BUCKET, DEFAULT_ORG, DEFAULT_URL, InfluxConfig};
use transport_mqtt::{DEFAULT_BROKER_URL, MqttConfig, random_client_id};

use crate::error::IngestorError;

#[derive(Parser)]
#[command(name = "fleet-ingestor", about = "Ингестор телеметрии флота: MQTT → InfluxDB")]
pub struct Cli {
    #[command(flatten)]
    pub args: IngestArgs,
}

impl Cli {
    /// Собрать конфигурацию из окружения. Аргументы командной строки не
    /// разбираются: у процесса нет другой поверхности управления.
    pub fn from_env() -> Result<Self, clap::Error> {
        Self::try_parse_from(std::env::args_os().take(1))
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

// ═══════════════════════════════════════════════════════════════
//  Environment
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct IngestArgs {
    /// MQTT брокер (tcp://host:port)
    #[arg(env = "BROKER_URL", default_value = DEFAULT_BROKER_URL)]
    pub broker_url: String,

    /// Паттерн подписки
    #[arg(env = "TOPIC", default_value = DEFAULT_TOPIC)]
    pub topic: String,

    #[arg(env = "WORKER_COUNT", default_value_t = DEFAULT_WORKER_COUNT)]
    pub worker_count: usize,

    /// Ёмкость очереди; сверх неё сообщения отбрасываются
    #[arg(env = "QUEUE_SIZE", default_value_t = DEFAULT_QUEUE_SIZE)]
    pub queue_size: usize,

    /// MQTT client id (по умолчанию ingestor_<random>)
    #[arg(env = "MQTT_CLIENT_ID")]
    pub mqtt_client_id: Option<String>,

    #[arg(env = "DISCONNECT_GRACE_MS", default_value_t = 250)]
    pub disconnect_grace_ms: u64,

    /// Ограничение flush при остановке, 0 = без ограничения
    #[arg(env = "SINK_FLUSH_TIMEOUT_MS", default_value_t = 10_000)]
    pub sink_flush_timeout_ms: u64,

    #[arg(env = "INFLUX_URL", default_value = DEFAULT_URL)]
    pub influx_url: String,

    #[arg(env = "INFLUX_TOKEN", default_value = "", hide_env_values = true)]
    pub influx_token: String,

    #[arg(env = "INFLUX_ORG", default_value = DEFAULT_ORG)]
    pub influx_org: String,

    #[arg(env = "INFLUX_BUCKET", default_value = DEFAULT_BUCKET)]
    pub influx_bucket: String,

    #[arg(env = "INFLUX_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub influx_batch_size: usize,

    #[arg(env = "INFLUX_FLUSH_INTERVAL_MS", default_value_t = 1000)]
    pub influx_flush_interval_ms: u64,

    /// Предел одного HTTP-запроса записи
    #[arg(env = "INFLUX_REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    pub influx_request_timeout_ms: u64,

    #[arg(env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

// ═══════════════════════════════════════════════════════════════
//  Effective config
// ═══════════════════════════════════════════════════════════════

/// Проверенная конфигурация процесса. Не меняется после загрузки.
#[derive(Debug, Clone)]
pub struct Effective {
    pub pipeline: PipelineConfig,
    pub mqtt: MqttConfig,
    pub influx: InfluxConfig,
}

impl Effective {
    pub fn new(args: &IngestArgs) -> Result<Self, IngestorError> {
        let pipeline = PipelineConfig {
            topic: args.topic.clone(),
            worker_count: args.worker_count,
            queue_size: args.queue_size,
            disconnect_grace: Duration::from_millis(args.disconnect_grace_ms),
            flush_timeout: match args.sink_flush_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        };
        pipeline.validate().map_err(IngestorError::Config)?;

        let client_id = args
            .mqtt_client_id
            .clone()
            .unwrap_or_else(|| random_client_id("ingestor"));
        let mqtt = MqttConfig::from_url(&args.broker_url, client_id)?;

        let influx = InfluxConfig {
            url: args.influx_url.clone(),
            token: args.influx_token.clone(),
            org: args.influx_org.clone(),
            bucket: args.influx_bucket.clone(),
            batch_size: args.influx_batch_size,
            flush_interval: Duration::from_millis(args.influx_flush_interval_ms),
            buffer_capacity: args.influx_batch_size.saturating_mul(4),
            request_timeout: Duration::from_millis(args.influx_request_timeout_ms),
        };
        influx.validate()?;

        Ok(Self { pipeline, mqtt, influx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn args() -> IngestArgs {
        IngestArgs {
            broker_url: "tcp://broker:1884".into(),
            topic: DEFAULT_TOPIC.into(),
            worker_count: 8,
            queue_size: 64,
            mqtt_client_id: Some("ingestor_42".into()),
            disconnect_grace_ms: 250,
            sink_flush_timeout_ms: 500,
            influx_url: DEFAULT_URL.into(),
            influx_token: "secret".into(),
            influx_org: DEFAULT_ORG.into(),
            influx_bucket: DEFAULT_BUCKET.into(),
            influx_batch_size: DEFAULT_BATCH_SIZE,
            influx_flush_interval_ms: 1000,
            influx_request_timeout_ms: 2000,
            log_format: LogFormat::Text,
        }
    }

    #[test]
    fn every_key_comes_from_environment_only() {
        let cmd = Cli::command();
        cmd.clone().debug_assert();
        let keys: Vec<_> = cmd.get_arguments().filter(|a| a.get_env().is_some()).collect();
        assert_eq!(keys.len(), 15);
        for arg in keys {
            assert!(arg.get_long().is_none(), "{} has a flag", arg.get_id());
            assert!(arg.get_short().is_none(), "{} has a flag", arg.get_id());
        }
    }

    #[test]
    fn builds_effective_config() {
        let eff = Effective::new(&args()).unwrap();

        assert_eq!(eff.pipeline.worker_count, 8);
        assert_eq!(eff.pipeline.queue_size, 64);
        assert_eq!(eff.pipeline.flush_timeout, Some(Duration::from_millis(500)));
        assert_eq!(eff.mqtt.host, "broker");
        assert_eq!(eff.mqtt.port, 1884);
        assert_eq!(eff.mqtt.client_id, "ingestor_42");
        assert_eq!(eff.influx.token, "secret");
        assert_eq!(eff.influx.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn zero_flush_timeout_means_unbounded() {
        let a = IngestArgs { sink_flush_timeout_ms: 0, ..args() };
        assert_eq!(Effective::new(&a).unwrap().pipeline.flush_timeout, None);
    }

    #[test]
    fn generated_client_id_has_prefix() {
        let a = IngestArgs { mqtt_client_id: None, ..args() };
        let id = Effective::new(&a).unwrap().mqtt.client_id;
        assert!(id.starts_with("ingestor_"), "{id}");
    }

    #[test]
    fn zero_queue_size_is_a_config_error() {
        let a = IngestArgs { queue_size: 0, ..args() };
        assert!(matches!(Effective::new(&a), Err(IngestorError::Config(_))));
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let a = IngestArgs { influx_request_timeout_ms: 0, ..args() };
        assert!(matches!(Effective::new(&a), Err(IngestorError::Client(_))));
    }

    #[test]
    fn bad_broker_scheme_is_rejected() {
        let a = IngestArgs { broker_url: "ws://broker:80".into(), ..args() };
        assert!(matches!(Effective::new(&a), Err(IngestorError::Client(_))));
    }
}
