//! Tracker host process.
//!
//! Reads completed-operation events as JSON lines on stdin (standing in for the
//! store's completion notifications), runs them through a registered
//! `ForwardingBridge`, and prints every message that reaches the bus on stdout.
//!
//! ```text
//! {"kind":"create-entity","outcome":{"status":"succeeded"},"subject_id":"<uuid>"}
//! ```

use std::io::BufRead;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{info, warn};

use creation_tracker_events::{
    EventBus, ForwardingMessage, InMemoryEventBus, InMemoryEventSource, OperationEvent,
    OutboundChannel,
};
use creation_tracker_infra::workers::MessageConsumer;
use creation_tracker_infra::{
    BridgeOptions, BusKind, BusOutboundChannel, ForwardingBridge, TrackerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    creation_tracker_observability::init();

    let config = TrackerConfig::from_env().context("invalid tracker configuration")?;
    info!(bus = ?config.bus, tracked_kind = %config.tracked_kind, "starting creation tracker");

    match config.bus {
        BusKind::Memory => run(Arc::new(InMemoryEventBus::<ForwardingMessage>::new()), &config).await,
        BusKind::Redis => run_redis(&config).await,
    }
}

#[cfg(feature = "redis")]
async fn run_redis(config: &TrackerConfig) -> anyhow::Result<()> {
    use creation_tracker_infra::event_bus::RedisPubSubBus;

    let url = config.redis_url.as_deref().context("REDIS_URL is not set")?;
    let bus = RedisPubSubBus::new(url, config.redis_channel.clone())?;
    info!(channel = bus.channel(), "publishing to redis pub/sub");
    run(Arc::new(bus), config).await
}

#[cfg(not(feature = "redis"))]
async fn run_redis(_config: &TrackerConfig) -> anyhow::Result<()> {
    anyhow::bail!("TRACKER_BUS=redis requires building with the `redis` feature")
}

async fn run<B>(bus: Arc<B>, config: &TrackerConfig) -> anyhow::Result<()>
where
    B: EventBus<ForwardingMessage> + 'static,
{
    let consumer = MessageConsumer::spawn("forwarded-messages", bus.as_ref(), |message: ForwardingMessage| {
        serde_json::to_string(&message).map(|line| println!("{line}"))
    })
    .context("failed to start bus consumer")?;

    let source = Arc::new(InMemoryEventSource::new());
    let bridge = ForwardingBridge::with_current_runtime(BusOutboundChannel::new(bus), BridgeOptions::from(config))?;
    bridge.register(source.clone())?;

    let feeder = {
        let source = Arc::clone(&source);
        tokio::task::spawn_blocking(move || replay_stdin(&source))
    };
    let (emitted, skipped) = feeder.await.context("stdin reader panicked")??;
    info!(emitted, skipped, "input exhausted");

    bridge.dispose();
    source.close();
    wait_for_in_flight(&bridge, config.send_timeout.unwrap_or(Duration::from_secs(30))).await;
    let stats = serde_json::to_string(&bridge.stats()).context("failed to encode bridge stats")?;
    info!(state = %bridge.state(), stats = %stats, "creation tracker stopped");

    tokio::task::spawn_blocking(move || consumer.shutdown())
        .await
        .context("bus consumer panicked")?;
    Ok(())
}

fn replay_stdin(source: &InMemoryEventSource) -> std::io::Result<(u64, u64)> {
    let (mut emitted, mut skipped) = (0u64, 0u64);

    for (idx, line) in std::io::stdin().lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<OperationEvent>(&line) {
            Ok(event) => {
                source.emit(&event);
                emitted += 1;
            }
            Err(e) => {
                warn!(line = idx + 1, error = %e, "skipping malformed operation event");
                skipped += 1;
            }
        }
    }

    Ok((emitted, skipped))
}

/// Sends outlive `dispose`; give them a bounded chance to land before exit.
async fn wait_for_in_flight<C: OutboundChannel>(bridge: &ForwardingBridge<C>, limit: Duration) {
    let started = Instant::now();
    while bridge.stats().in_flight > 0 {
        if started.elapsed() >= limit {
            warn!(in_flight = bridge.stats().in_flight, "giving up on in-flight sends");
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
