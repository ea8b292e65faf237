//! Тестовые двойники коллабораторов.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use ingest_api::{ClientError, DataPoint, Delivery, SinkErrors, TimeSeriesSink, Transport};

/// Общий журнал вызовов: позволяет проверить порядок шагов остановки
/// сразу по обоим коллабораторам.
pub type EventLog = Arc<Mutex<Vec<&'static str>>>;

fn log(events: &EventLog, event: &'static str) {
    events.lock().unwrap().push(event);
}

// ═══════════════════════════════════════════════════════════════
//  RecordingSink
// ═══════════════════════════════════════════════════════════════

pub struct RecordingSink {
    points: Mutex<Vec<DataPoint>>,
    events: EventLog,
    err_tx: Mutex<Option<mpsc::UnboundedSender<ClientError>>>,
    err_rx: Mutex<Option<mpsc::UnboundedReceiver<ClientError>>>,
    stalled: bool,
    closed: AtomicBool,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::with_events(EventLog::default())
    }
}

impl RecordingSink {
    pub fn with_events(events: EventLog) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            points: Mutex::new(Vec::new()),
            events,
            err_tx: Mutex::new(Some(tx)),
            err_rx: Mutex::new(Some(rx)),
            stalled: false,
            closed: AtomicBool::new(false),
        }
    }

    /// flush() и close() никогда не завершаются, как sink с зависшим
    /// запросом записи. close() успевает пометить клиент закрытым.
    pub fn stalled() -> Self {
        Self { stalled: true, ..Self::default() }
    }

    pub fn points(&self) -> Vec<DataPoint> {
        self.points.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Сообщить асинхронную ошибку записи.
    pub fn fail(&self, error: ClientError) {
        if let Some(tx) = self.err_tx.lock().unwrap().as_ref() {
            let _ = tx.send(error);
        }
    }
}

struct ChannelErrors(mpsc::UnboundedReceiver<ClientError>);

impl SinkErrors for ChannelErrors {
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<ClientError>> + Send + '_>> {
        Box::pin(self.0.recv())
    }
}

impl TimeSeriesSink for RecordingSink {
    fn submit(&self, point: DataPoint) {
        if !self.is_closed() {
            self.points.lock().unwrap().push(point);
        }
    }

    fn errors(&self) -> Option<Box<dyn SinkErrors>> {
        self.err_rx
            .lock()
            .unwrap()
            .take()
            .map(|rx| Box::new(ChannelErrors(rx)) as Box<dyn SinkErrors>)
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            log(&self.events, "flush");
            if self.stalled {
                std::future::pending::<()>().await;
            }
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            log(&self.events, "close");
            self.closed.store(true, Ordering::SeqCst);
            if self.stalled {
                std::future::pending::<()>().await;
            }
            self.err_tx.lock().unwrap().take();
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  ScriptedTransport
// ═══════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct ScriptedTransport {
    connect_error: Option<ClientError>,
    subscribe_error: Option<ClientError>,
    delivery: Mutex<Option<Arc<dyn Delivery>>>,
    topic: Mutex<Option<String>>,
    late_payload: Mutex<Option<Vec<u8>>>,
    events: EventLog,
}

impl ScriptedTransport {
    pub fn with_events(events: EventLog) -> Self {
        Self { events, ..Self::default() }
    }

    pub fn failing_connect(error: ClientError) -> Self {
        Self { connect_error: Some(error), ..Self::default() }
    }

    pub fn failing_subscribe(error: ClientError) -> Self {
        Self { subscribe_error: Some(error), ..Self::default() }
    }

    /// Имитировать входящее сообщение. false, если подписки нет.
    pub fn push(&self, topic: &str, payload: Vec<u8>) -> bool {
        let delivery = self.delivery.lock().unwrap().clone();
        match delivery {
            Some(d) => {
                d.deliver(topic, payload);
                true
            }
            None => false,
        }
    }

    /// Доставить `payload` в самом начале disconnect() и дать воркерам
    /// время его забрать, прежде чем отвязать callback.
    pub fn deliver_on_disconnect(&self, payload: Vec<u8>) {
        *self.late_payload.lock().unwrap() = Some(payload);
    }

    pub fn subscribed_topic(&self) -> Option<String> {
        self.topic.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        Box::pin(async move {
            log(&self.events, "connect");
            match &self.connect_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        })
    }

    fn subscribe(
        &self,
        topic_pattern: &str,
        delivery: Arc<dyn Delivery>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        let topic_pattern = topic_pattern.to_string();
        Box::pin(async move {
            log(&self.events, "subscribe");
            if let Some(e) = &self.subscribe_error {
                return Err(e.clone());
            }
            *self.topic.lock().unwrap() = Some(topic_pattern);
            *self.delivery.lock().unwrap() = Some(delivery);
            Ok(())
        })
    }

    fn disconnect(&self, _grace: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            log(&self.events, "disconnect");
            let late = self.late_payload.lock().unwrap().take();
            if let Some(payload) = late {
                self.push("fleet/late/telemetry", payload);
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.delivery.lock().unwrap().take();
        })
    }
}
