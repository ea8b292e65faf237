//! InfluxDB v2 implementation of [`ingest_api::TimeSeriesSink`].
//!
//! Points are encoded as line protocol and written with
//! `POST /api/v2/write?org=..&bucket=..&precision=ns`. No retries: failed
//! batches are reported on the error stream and discarded.

mod config;
mod line_protocol;
mod sink;

pub use config::{
    DEFAULT_BATCH_SIZE, DEFAULT_BUCKET, DEFAULT_FLUSH_INTERVAL, DEFAULT_ORG, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_URL, InfluxConfig,
};
pub use line_protocol::encode_point;
pub use sink::InfluxSink;
