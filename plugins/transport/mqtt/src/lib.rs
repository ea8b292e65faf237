//! MQTT implementation of [`ingest_api::Transport`] on top of rumqttc.
//!
//! Clean session, QoS 1. After every reconnect the event loop re-subscribes
//! the stored topic, since a clean session drops subscriptions.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ingest_api::{ClientError, Delivery, Transport};

mod config;

pub use config::{
    DEFAULT_BROKER_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_KEEP_ALIVE, MqttConfig,
    parse_broker_url, random_client_id,
};

/// Пауза между попытками после ошибки соединения.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

type Subscription = Arc<Mutex<Option<(String, Arc<dyn Delivery>)>>>;

fn current_subscription(sub: &Subscription) -> Option<(String, Arc<dyn Delivery>)> {
    sub.lock().unwrap_or_else(|p| p.into_inner()).clone()
}

pub struct MqttTransport {
    config: MqttConfig,
    client: AsyncClient,
    eventloop: Mutex<Option<EventLoop>>,
    subscription: Subscription,
    task: Mutex<Option<JoinHandle<()>>>,
    token: CancellationToken,
}

impl MqttTransport {
    pub fn new(config: MqttConfig) -> Self {
        let mut opts = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        opts.set_keep_alive(config.keep_alive);
        opts.set_clean_session(true);
        let (client, eventloop) = AsyncClient::new(opts, config.request_capacity);

        Self {
            config,
            client,
            eventloop: Mutex::new(Some(eventloop)),
            subscription: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
            token: CancellationToken::new(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    fn take_eventloop(&self) -> Option<EventLoop> {
        self.eventloop.lock().unwrap_or_else(|p| p.into_inner()).take()
    }
}

/// Крутить event loop до первого CONNACK.
async fn await_connack(eventloop: &mut EventLoop) -> Result<(), ClientError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(_) => {}
            Err(e) => return Err(ClientError::io(format!("mqtt connect: {e}"))),
        }
    }
}

async fn run_event_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    subscription: Subscription,
    token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = token.cancelled() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if let Some((_, delivery)) = current_subscription(&subscription) {
                    delivery.deliver(&publish.topic, publish.payload.to_vec());
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("mqtt reconnected");
                if let Some((topic, _)) = current_subscription(&subscription) {
                    // try_subscribe: этот цикл и есть потребитель очереди запросов.
                    match client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
                        Ok(()) => tracing::info!(%topic, "mqtt resubscribed"),
                        Err(e) => tracing::error!(%topic, error = %e, "mqtt resubscribe failed"),
                    }
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!("mqtt disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "mqtt connection error, retrying");
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(RECONNECT_BACKOFF) => {}
                }
            }
        }
    }
    tracing::debug!("mqtt event loop stopped");
}

impl Transport for MqttTransport {
    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        Box::pin(async move {
            let mut eventloop = self
                .take_eventloop()
                .ok_or_else(|| ClientError::closed("mqtt transport already connected"))?;

            let broker = format!("{}:{}", self.config.host, self.config.port);
            match tokio::time::timeout(self.config.connect_timeout, await_connack(&mut eventloop)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(ClientError::io(format!(
                        "mqtt connect to {broker}: no CONNACK within {:?}",
                        self.config.connect_timeout
                    )));
                }
            }
            tracing::info!(%broker, client_id = %self.config.client_id, "mqtt connected");

            let task = tokio::spawn(run_event_loop(
                eventloop,
                self.client.clone(),
                self.subscription.clone(),
                self.token.clone(),
            ));
            *self.task.lock().unwrap_or_else(|p| p.into_inner()) = Some(task);
            Ok(())
        })
    }

    fn subscribe(
        &self,
        topic_pattern: &str,
        delivery: Arc<dyn Delivery>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        let topic = topic_pattern.to_string();
        Box::pin(async move {
            *self.subscription.lock().unwrap_or_else(|p| p.into_inner()) =
                Some((topic.clone(), delivery));
            self.client
                .subscribe(topic.as_str(), QoS::AtLeastOnce)
                .await
                .map_err(|e| ClientError::io(format!("mqtt subscribe '{topic}': {e}")))
        })
    }

    fn disconnect(&self, grace: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            // Новых доставок после disconnect не будет.
            self.subscription.lock().unwrap_or_else(|p| p.into_inner()).take();

            if let Err(e) = self.client.try_disconnect() {
                tracing::debug!(error = %e, "mqtt disconnect request not queued");
            }

            let task = self.task.lock().unwrap_or_else(|p| p.into_inner()).take();
            if let Some(mut task) = task {
                if tokio::time::timeout(grace, &mut task).await.is_err() {
                    tracing::warn!(grace_ms = grace.as_millis() as u64, "mqtt disconnect grace elapsed");
                    self.token.cancel();
                    task.abort();
                }
            }
            self.token.cancel();
            tracing::info!(client_id = %self.config.client_id, "mqtt disconnected");
        })
    }
}
