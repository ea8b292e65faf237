use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use ingest_api::{ClientError, DataPoint, SinkErrors, TimeSeriesSink};

use crate::config::InfluxConfig;
use crate::line_protocol::encode_point;

/// Сколько асинхронных ошибок держать, пока их никто не читает.
const ERROR_BUFFER: usize = 1024;

enum Command {
    Point(DataPoint),
    Flush(oneshot::Sender<()>),
    Close(oneshot::Sender<()>),
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Снимает фоновую задачу, если future close() бросили, не дождавшись.
struct AbortOnDrop(Option<JoinHandle<()>>);

impl AbortOnDrop {
    async fn join(mut self) {
        if let Some(task) = self.0.as_mut() {
            let _ = task.await;
        }
        self.0 = None;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if let Some(task) = self.0.take() {
            task.abort();
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Error reporting
// ═══════════════════════════════════════════════════════════════

#[derive(Clone)]
struct ErrorReporter(mpsc::Sender<ClientError>);

impl ErrorReporter {
    fn report(&self, error: ClientError) {
        if let Err(mpsc::error::TrySendError::Full(e)) = self.0.try_send(error) {
            tracing::debug!(error = %e, "error stream full, discarding");
        }
    }
}

struct ErrorStream(mpsc::Receiver<ClientError>);

impl SinkErrors for ErrorStream {
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<ClientError>> + Send + '_>> {
        Box::pin(self.0.recv())
    }
}

// ═══════════════════════════════════════════════════════════════
//  HTTP writer
// ═══════════════════════════════════════════════════════════════

#[derive(serde::Deserialize)]
struct InfluxErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

struct HttpWriter {
    http: reqwest::Client,
    write_url: String,
    org: String,
    bucket: String,
    auth: String,
}

impl HttpWriter {
    fn new(cfg: &InfluxConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|e| ClientError::config(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            write_url: cfg.write_url(),
            org: cfg.org.clone(),
            bucket: cfg.bucket.clone(),
            auth: format!("Token {}", cfg.token),
        })
    }

    async fn write(&self, body: String) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(reqwest::header::AUTHORIZATION, &self.auth)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::io(format!("influx request: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<InfluxErrorBody>(&text) {
            Ok(InfluxErrorBody { message: Some(m), code }) => match code {
                Some(code) => format!("{code}: {m}"),
                None => m,
            },
            _ => text,
        };
        let message = format!("influx write failed ({status}): {message}");
        if status.is_server_error() {
            Err(ClientError::io(message))
        } else {
            Err(ClientError::format_err(message))
        }
    }
}

/// Отправить накопленный батч. Ошибки уходят в поток ошибок, повторов нет.
async fn write_batch(writer: &HttpWriter, batch: &mut Vec<DataPoint>, errors: &ErrorReporter) {
    if batch.is_empty() {
        return;
    }
    let mut body = String::with_capacity(batch.len() * 128);
    for point in batch.drain(..) {
        if let Err(e) = encode_point(&point, &mut body) {
            errors.report(e);
        }
    }
    if body.is_empty() {
        return;
    }
    if let Err(e) = writer.write(body).await {
        errors.report(e);
    }
}

async fn run_writer(
    writer: HttpWriter,
    mut commands: mpsc::Receiver<Command>,
    errors: ErrorReporter,
    cfg: InfluxConfig,
) {
    let mut batch: Vec<DataPoint> = Vec::with_capacity(cfg.batch_size);
    let start = tokio::time::Instant::now() + cfg.flush_interval;
    let mut ticker = tokio::time::interval_at(start, cfg.flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(Command::Point(point)) => {
                    batch.push(point);
                    if batch.len() >= cfg.batch_size {
                        write_batch(&writer, &mut batch, &errors).await;
                    }
                }
                Some(Command::Flush(ack)) => {
                    write_batch(&writer, &mut batch, &errors).await;
                    let _ = ack.send(());
                }
                Some(Command::Close(ack)) => {
                    write_batch(&writer, &mut batch, &errors).await;
                    let _ = ack.send(());
                    break;
                }
                None => {
                    write_batch(&writer, &mut batch, &errors).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                write_batch(&writer, &mut batch, &errors).await;
            }
        }
    }
    tracing::debug!(bucket = %cfg.bucket, "influx writer stopped");
}

// ═══════════════════════════════════════════════════════════════
//  InfluxSink
// ═══════════════════════════════════════════════════════════════

/// Клиент записи InfluxDB v2 с фоновым батчингом.
///
/// `submit` кладёт точку в ограниченный буфер и сразу возвращается.
/// Фоновая задача собирает батчи до `batch_size` точек или до
/// `flush_interval` и отправляет их одним POST'ом. Ошибки записи
/// доступны через [`TimeSeriesSink::errors`].
pub struct InfluxSink {
    commands: mpsc::Sender<Command>,
    errors: Mutex<Option<ErrorReporter>>,
    errors_rx: Mutex<Option<mpsc::Receiver<ClientError>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl InfluxSink {
    /// Создать клиент и запустить фоновую задачу.
    /// Должен вызываться внутри tokio runtime.
    pub fn new(cfg: InfluxConfig) -> Result<Self, ClientError> {
        cfg.validate()?;
        let writer = HttpWriter::new(&cfg)?;

        let (commands, commands_rx) = mpsc::channel(cfg.buffer_capacity);
        let (errors_tx, errors_rx) = mpsc::channel(ERROR_BUFFER);
        let reporter = ErrorReporter(errors_tx);

        tracing::info!(url = %cfg.url, org = %cfg.org, bucket = %cfg.bucket, "influx sink started");
        let task = tokio::spawn(run_writer(writer, commands_rx, reporter.clone(), cfg));

        Ok(Self {
            commands,
            errors: Mutex::new(Some(reporter)),
            errors_rx: Mutex::new(Some(errors_rx)),
            task: Mutex::new(Some(task)),
            closed: AtomicBool::new(false),
        })
    }

    fn report(&self, error: ClientError) {
        if let Some(reporter) = lock(&self.errors).as_ref() {
            reporter.report(error);
        }
    }
}

impl TimeSeriesSink for InfluxSink {
    fn submit(&self, point: DataPoint) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        match self.commands.try_send(Command::Point(point)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.report(ClientError::io("write buffer full, point dropped"));
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    fn errors(&self) -> Option<Box<dyn SinkErrors>> {
        lock(&self.errors_rx)
            .take()
            .map(|rx| Box::new(ErrorStream(rx)) as Box<dyn SinkErrors>)
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let (ack, done) = oneshot::channel();
            if self.commands.send(Command::Flush(ack)).await.is_ok() {
                let _ = done.await;
            }
        })
    }

    /// Дописывает хвост и останавливает writer. Если вызывающий бросит
    /// future по таймауту, writer снимается вместе с недописанным батчем.
    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            // Остаётся единственный отправитель ошибок, в writer: поток
            // ошибок завершится вместе с ним.
            lock(&self.errors).take();
            let writer = AbortOnDrop(lock(&self.task).take());

            let (ack, done) = oneshot::channel();
            if self.commands.send(Command::Close(ack)).await.is_ok() {
                let _ = done.await;
            }
            writer.join().await;
            tracing::info!("influx sink closed");
        })
    }
}
