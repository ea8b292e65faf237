use std::time::Duration;

use ingest_api::ClientError;

pub const DEFAULT_URL: &str = "http://localhost:8086";
pub const DEFAULT_ORG: &str = "DesmoTelemetry";
pub const DEFAULT_BUCKET: &str = "Telemetry";
pub const DEFAULT_BATCH_SIZE: usize = 5000;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Параметры клиента InfluxDB v2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    /// Базовый URL сервера, без `/api/v2/...`.
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    /// Максимум точек в одном запросе записи.
    pub batch_size: usize,
    /// Как часто отправлять неполный батч.
    pub flush_interval: Duration,
    /// Ёмкость входного буфера. Точки сверх неё отбрасываются.
    pub buffer_capacity: usize,
    /// Предел одного запроса записи; зависший POST не держит writer дольше.
    pub request_timeout: Duration,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            token: String::new(),
            org: DEFAULT_ORG.into(),
            bucket: DEFAULT_BUCKET.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            buffer_capacity: DEFAULT_BATCH_SIZE * 4,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl InfluxConfig {
    pub fn validate(&self) -> Result<(), ClientError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ClientError::config(format!(
                "influx url must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        if self.org.is_empty() || self.bucket.is_empty() {
            return Err(ClientError::config("influx org and bucket must not be empty"));
        }
        if self.batch_size == 0 || self.buffer_capacity == 0 {
            return Err(ClientError::config("influx batch_size and buffer_capacity must be at least 1"));
        }
        if self.flush_interval.is_zero() {
            return Err(ClientError::config("influx flush_interval must be positive"));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::config("influx request_timeout must be positive"));
        }
        Ok(())
    }

    pub(crate) fn write_url(&self) -> String {
        format!("{}/api/v2/write", self.url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_api::ErrorKind;

    #[test]
    fn default_is_valid() {
        let cfg = InfluxConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.write_url(), "http://localhost:8086/api/v2/write");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let cfg = InfluxConfig { url: "https://influx.local:8086/".into(), ..Default::default() };
        assert_eq!(cfg.write_url(), "https://influx.local:8086/api/v2/write");
    }

    #[test]
    fn rejects_bad_values() {
        let bad_scheme = InfluxConfig { url: "localhost:8086".into(), ..Default::default() };
        assert_eq!(bad_scheme.validate().unwrap_err().kind(), ErrorKind::Config);

        let zero_batch = InfluxConfig { batch_size: 0, ..Default::default() };
        assert!(zero_batch.validate().is_err());

        let zero_interval = InfluxConfig { flush_interval: Duration::ZERO, ..Default::default() };
        assert!(zero_interval.validate().is_err());

        let zero_timeout = InfluxConfig { request_timeout: Duration::ZERO, ..Default::default() };
        assert!(zero_timeout.validate().is_err());
    }
}
