use std::time::Duration;

use rand::Rng;

use ingest_api::ClientError;

pub const DEFAULT_BROKER_URL: &str = "tcp://localhost:1883";
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(20);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_PORT: u16 = 1883;

/// `<prefix>_<0..9999>`: несколько экземпляров не выбивают друг друга с брокера.
pub fn random_client_id(prefix: &str) -> String {
    let n: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{prefix}_{n}")
}

/// Адрес брокера: `tcp://host:port`, `mqtt://host:port` или `host:port`.
/// Порт по умолчанию 1883.
pub fn parse_broker_url(url: &str) -> Result<(String, u16), ClientError> {
    let rest = match url.split_once("://") {
        Some(("tcp" | "mqtt", rest)) => rest,
        Some((scheme, _)) => {
            return Err(ClientError::config(format!(
                "unsupported broker scheme '{scheme}' in '{url}' (expected tcp:// or mqtt://)"
            )));
        }
        None => url,
    };
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Err(ClientError::config(format!("broker url '{url}' has no host")));
    }

    match rest.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() {
                return Err(ClientError::config(format!("broker url '{url}' has no host")));
            }
            let port = port
                .parse::<u16>()
                .map_err(|_| ClientError::config(format!("invalid broker port '{port}' in '{url}'")))?;
            Ok((host.to_string(), port))
        }
        None => Ok((rest.to_string(), DEFAULT_PORT)),
    }
}

/// Параметры MQTT-клиента.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    /// Сколько ждать CONNACK при старте.
    pub connect_timeout: Duration,
    /// Ёмкость очереди запросов клиента rumqttc.
    pub request_capacity: usize,
}

impl MqttConfig {
    pub fn from_url(url: &str, client_id: impl Into<String>) -> Result<Self, ClientError> {
        let (host, port) = parse_broker_url(url)?;
        let client_id = client_id.into();
        if client_id.is_empty() {
            return Err(ClientError::config("mqtt client id must not be empty"));
        }
        Ok(Self {
            host,
            port,
            client_id,
            keep_alive: DEFAULT_KEEP_ALIVE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_capacity: 100,
        })
    }
}
