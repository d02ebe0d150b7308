//! NetProbe Consumer - AMQP telemetry consumer
//!
//! Binds an exclusive queue on `telemetry_exchange`, derives alarms from each
//! sample and posts them to the alarm store. A message is acknowledged only
//! when every alarm it produced was accepted.

use anyhow::{Context, Result};
use netprobe_consumer::{
    shutdown::listen_for_signals, BrokerConnector, ConsumerConfig, HealthReporter, HttpAlarmSink, RedeliveryController, Shutdown,
};
use netprobe_core::{Evaluator, LogNotifier, MqttNotifier, Notifier};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("netprobe_consumer=info,netprobe_core=info")),
        )
        .init();

    let cfg = ConsumerConfig::load().await;
    info!(
        exchange = %cfg.broker.exchange,
        alarm_api = %cfg.alarm_api.base_url,
        policy = ?cfg.policy,
        "NetProbe consumer starting"
    );

    let notifier: Arc<dyn Notifier> = match &cfg.mqtt {
        Some(mqtt) => Arc::new(MqttNotifier::connect("netprobe-consumer", &mqtt.host, mqtt.port)),
        None => Arc::new(LogNotifier),
    };

    let health = HealthReporter::new(
        &cfg.service_name,
        &cfg.status_api.base_url,
        Duration::from_secs(cfg.status_api.timeout_secs),
        notifier,
    )
    .context("Failed to build status client")?;

    let sink = HttpAlarmSink::new(&cfg.alarm_api.base_url, Duration::from_secs(cfg.alarm_api.timeout_secs))
        .context("Failed to build alarm store client")?;

    let (trigger, shutdown) = Shutdown::channel();
    tokio::spawn(listen_for_signals(trigger));

    let controller = RedeliveryController::new(
        Evaluator::new(cfg.policy),
        Arc::new(sink),
        cfg.cooldown(),
        shutdown.clone(),
    );

    BrokerConnector::new(cfg.broker.clone(), health)
        .run(controller, shutdown)
        .await;

    info!("NetProbe consumer stopped");
    Ok(())
}
