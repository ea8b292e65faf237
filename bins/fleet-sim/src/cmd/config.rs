use std::time::Duration;

use clap::Args;

use transport_mqtt::{DEFAULT_BROKER_URL, parse_broker_url, random_client_id};

use super::error::SimError;

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct SimArgs {
    /// MQTT брокер (tcp://host:port)
    #[arg(long, env = "BROKER_URL", default_value = DEFAULT_BROKER_URL)]
    pub broker_url: String,

    /// ID машин через запятую
    #[arg(long, env = "VEHICLES", default_value = "101")]
    pub vehicles: String,

    /// Пакетов в секунду на машину
    #[arg(long, env = "RATE_HZ", default_value_t = 10.0)]
    pub rate_hz: f64,

    /// Seed ГСЧ (по умолчанию случайный)
    #[arg(long, env = "SEED")]
    pub seed: Option<u64>,

    #[arg(long, env = "MQTT_CLIENT_ID")]
    pub client_id: Option<String>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Effective {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub vehicles: Vec<u16>,
    pub period: Duration,
    pub seed: u64,
}

impl Effective {
    pub fn new(args: &SimArgs) -> Result<Self, SimError> {
        let (host, port) = parse_broker_url(&args.broker_url)?;
        let vehicles = parse_vehicles(&args.vehicles)?;
        if !(args.rate_hz.is_finite() && args.rate_hz > 0.0) {
            return Err(SimError::Config(format!("RATE_HZ must be positive, got {}", args.rate_hz)));
        }
        Ok(Self {
            host,
            port,
            client_id: args.client_id.clone().unwrap_or_else(|| random_client_id("sim_client")),
            vehicles,
            period: Duration::from_secs_f64(1.0 / args.rate_hz),
            seed: args.seed.unwrap_or_else(rand::random),
        })
    }
}

/// "101, 102,103" → [101, 102, 103]. Пустой список и повторы запрещены.
pub fn parse_vehicles(s: &str) -> Result<Vec<u16>, SimError> {
    let mut ids = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id: u16 = part
            .parse()
            .map_err(|_| SimError::Config(format!("invalid vehicle id '{part}'")))?;
        if ids.contains(&id) {
            return Err(SimError::Config(format!("duplicate vehicle id {id}")));
        }
        ids.push(id);
    }
    if ids.is_empty() {
        return Err(SimError::Config("VEHICLES must list at least one id".into()));
    }
    Ok(ids)
}
