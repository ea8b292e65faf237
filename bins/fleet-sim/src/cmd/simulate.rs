use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use ingest_api::now_ms;
use telemetry_packet::flags;
use transport_mqtt::DEFAULT_KEEP_ALIVE;

use super::config::Effective;
use super::domain::{Driver, SIM_DT, Vehicle};
use super::error::SimError;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

pub async fn run(args: &Effective) -> Result<(), SimError> {
    let mut opts = MqttOptions::new(args.client_id.clone(), args.host.clone(), args.port);
    opts.set_keep_alive(DEFAULT_KEEP_ALIVE);
    opts.set_clean_session(true);
    let (client, eventloop) = AsyncClient::new(opts, 100 * args.vehicles.len());

    let token = CancellationToken::new();
    let mut link = tokio::spawn(drive_link(eventloop, token.clone()));

    tracing::info!(
        broker = %format!("{}:{}", args.host, args.port),
        vehicles = ?args.vehicles,
        period_ms = args.period.as_millis() as u64,
        seed = args.seed,
        "fleet simulator started (Ctrl+C to stop)"
    );

    let tracker = TaskTracker::new();
    for &id in &args.vehicles {
        let seed = args.seed ^ u64::from(id);
        tracker.spawn(drive_vehicle(id, seed, args.period, client.clone(), token.clone()));
    }
    tracker.close();

    tokio::signal::ctrl_c().await?;
    tracing::info!("stopping");
    token.cancel();
    tracker.wait().await;

    if let Err(e) = client.try_disconnect() {
        tracing::debug!(error = %e, "disconnect request not queued");
    }
    if tokio::time::timeout(DISCONNECT_GRACE, &mut link).await.is_err() {
        link.abort();
    }
    tracing::info!("fleet simulator stopped");
    Ok(())
}

/// Крутит event loop rumqttc: без poll() публикации не уходят в сеть.
async fn drive_link(mut eventloop: EventLoop, token: CancellationToken) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("link established, telemetry active");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(e) => {
                if token.is_cancelled() {
                    break;
                }
                tracing::warn!(error = %e, "link lost, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

async fn drive_vehicle(
    id: u16,
    seed: u64,
    period: Duration,
    client: AsyncClient,
    token: CancellationToken,
) {
    let mut car = Vehicle::new(id, seed);
    let mut driver = Driver::new(seed.rotate_left(17));
    let topic = format!("fleet/{id}/telemetry");
    let mut interval = tokio::time::interval(period);
    let mut seq: u32 = 0;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        car.set_throttle(driver.throttle(seq));
        car.tick(SIM_DT);
        let record = car.snapshot(seq, now_ms().max(0) as u64);
        seq = seq.wrapping_add(1);

        let publish = client.publish(topic.as_str(), QoS::AtLeastOnce, false, record.encode().to_vec());
        let sent = tokio::select! {
            _ = token.cancelled() => break,
            r = publish => r,
        };
        if let Err(e) = sent {
            tracing::error!(vehicle = id, error = %e, "publish failed");
            break;
        }

        if seq % 100 == 0 {
            tracing::info!(
                vehicle = car.id(),
                seq,
                speed = record.speed,
                rpm = record.rpm,
                gear = record.gear,
                flags = ?flags::names(record.flags),
                driver = ?driver.state(),
                "tx"
            );
        }
    }
    tracing::debug!(vehicle = id, sent = seq, "vehicle stopped");
}
