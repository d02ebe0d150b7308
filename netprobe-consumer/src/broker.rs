//! Broker connector (AMQP)
//!
//! `Disconnected → Connecting → Connected → Connecting (on failure)`.
//! Connecting retries forever with a fixed delay and reports `error` health;
//! once connected it declares the durable fan-out exchange, binds an
//! exclusive server-named queue with an empty routing key and reports
//! `online`. Deliveries are handed one at a time to the redelivery
//! controller through an opaque acker.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    acker::Acker,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, ExchangeDeclareOptions,
        QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
};
use netprobe_core::{AckError, DeliveryAcker, ServiceState};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::BrokerConfig;
use crate::health::HealthReporter;
use crate::redelivery::RedeliveryController;
use crate::shutdown::Shutdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Disconnected,
    Connecting,
    Connected,
}

/// Acker lapin exposé au contrôleur sous forme opaque
pub struct LapinAcker(Acker);

#[async_trait]
impl DeliveryAcker for LapinAcker {
    async fn ack(&self) -> Result<(), AckError> {
        self.0
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| AckError::Broker(e.to_string()))
    }

    async fn nack_requeue(&self) -> Result<(), AckError> {
        self.0
            .nack(BasicNackOptions { requeue: true, ..Default::default() })
            .await
            .map_err(|e| AckError::Broker(e.to_string()))
    }
}

struct Session {
    connection: Connection,
    channel: Channel,
    consumer: Consumer,
}

enum ConsumeEnd {
    Shutdown,
    Lost(String),
}

pub struct BrokerConnector {
    cfg: BrokerConfig,
    reconnect_delay: Duration,
    health: HealthReporter,
    state: ConnectorState,
}

impl BrokerConnector {
    pub fn new(cfg: BrokerConfig, health: HealthReporter) -> Self {
        let reconnect_delay = Duration::from_secs(cfg.reconnect_delay_secs);
        Self { cfg, reconnect_delay, health, state: ConnectorState::Disconnected }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn state(&self) -> ConnectorState {
        self.state
    }

    fn transition(&mut self, next: ConnectorState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "broker connector state");
            self.state = next;
        }
    }

    /// Main loop. Returns only on shutdown; connectivity errors are never fatal.
    pub async fn run(mut self, controller: RedeliveryController, mut shutdown: Shutdown) {
        loop {
            self.transition(ConnectorState::Connecting);
            let Some(mut session) = self.connect_with_retry(&mut shutdown).await else {
                break;
            };
            self.transition(ConnectorState::Connected);

            match Self::consume(&mut session, &controller, &mut shutdown).await {
                ConsumeEnd::Shutdown => {
                    self.health.report(ServiceState::Offline, Some("shutdown")).await;
                    close(session).await;
                    self.transition(ConnectorState::Disconnected);
                    return;
                }
                ConsumeEnd::Lost(reason) => {
                    warn!("broker consumption ended: {reason}, reconnecting");
                    self.health.report(ServiceState::Error, Some(&reason)).await;
                    close(session).await;
                }
            }
        }
        self.health.report(ServiceState::Offline, Some("shutdown")).await;
        self.transition(ConnectorState::Disconnected);
    }

    async fn connect_with_retry(&mut self, shutdown: &mut Shutdown) -> Option<Session> {
        let mut attempt: u32 = 0;
        loop {
            if shutdown.is_triggered() {
                return None;
            }
            attempt += 1;
            info!(attempt, exchange = %self.cfg.exchange, "connecting to broker");
            match self.open_session().await {
                Ok(session) => {
                    info!(attempt, "connected to broker, waiting for telemetry");
                    self.health.report(ServiceState::Online, None).await;
                    return Some(session);
                }
                Err(e) => {
                    error!(attempt, "broker connection failed: {e}, retrying in {:?}", self.reconnect_delay);
                    self.health.report(ServiceState::Error, Some(&e.to_string())).await;
                    tokio::select! {
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                        _ = shutdown.wait() => return None,
                    }
                }
            }
        }
    }

    async fn open_session(&self) -> lapin::Result<Session> {
        let connection = Connection::connect(&self.cfg.url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        channel
            .exchange_declare(
                &self.cfg.exchange,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;
        // file exclusive nommée par le serveur : chaque instance reçoit tout
        let queue = channel
            .queue_declare("", QueueDeclareOptions { exclusive: true, ..Default::default() }, FieldTable::default())
            .await?;
        channel
            .queue_bind(queue.name().as_str(), &self.cfg.exchange, "", QueueBindOptions::default(), FieldTable::default())
            .await?;
        channel.basic_qos(self.cfg.prefetch, BasicQosOptions::default()).await?;

        let consumer = channel
            .basic_consume(
                queue.name().as_str(),
                &self.cfg.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        debug!(queue = queue.name().as_str(), "queue bound to exchange");

        Ok(Session { connection, channel, consumer })
    }

    /// Une livraison à la fois : ack ou nack avant de prendre la suivante.
    async fn consume(session: &mut Session, controller: &RedeliveryController, shutdown: &mut Shutdown) -> ConsumeEnd {
        loop {
            tokio::select! {
                _ = shutdown.wait() => return ConsumeEnd::Shutdown,
                next = session.consumer.next() => match next {
                    Some(Ok(delivery)) => {
                        debug!(tag = delivery.delivery_tag, redelivered = delivery.redelivered, "telemetry received");
                        let acker = LapinAcker(delivery.acker);
                        if let Err(e) = controller.handle(&delivery.data, &acker).await {
                            return ConsumeEnd::Lost(e.to_string());
                        }
                    }
                    Some(Err(e)) => return ConsumeEnd::Lost(e.to_string()),
                    None => return ConsumeEnd::Lost("consumer stream closed".into()),
                },
            }
        }
    }
}

async fn close(session: Session) {
    if let Err(e) = session.channel.close(200, "bye").await {
        debug!("channel close: {e}");
    }
    if let Err(e) = session.connection.close(200, "bye").await {
        debug!("connection close: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netprobe_core::{ChangeEvent, Evaluator};
    use netprobe_devkit::{RecordingNotifier, ScriptedSink};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unreachable_broker_retries_until_shutdown() {
        // port fermé : refus immédiat
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier = RecordingNotifier::new();
        let health = HealthReporter::new("consumer", "http://127.0.0.1:9", Duration::from_millis(200), Arc::new(notifier.clone())).unwrap();
        let cfg = BrokerConfig { url: format!("amqp://{addr}/%2f"), ..Default::default() };
        let connector = BrokerConnector::new(cfg, health).with_reconnect_delay(Duration::from_millis(20));
        assert_eq!(connector.state(), ConnectorState::Disconnected);

        let (trigger, shutdown) = Shutdown::channel();
        let controller = RedeliveryController::new(
            Evaluator::default(),
            Arc::new(ScriptedSink::new()),
            Duration::from_secs(5),
            shutdown.clone(),
        );
        let task = tokio::spawn(connector.run(controller, shutdown));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!task.is_finished());
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

        // plusieurs échecs mais une seule transition vers error, puis offline
        let states: Vec<ServiceState> = notifier
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ChangeEvent::StatusChanged(s) => Some(s.status),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![ServiceState::Error, ServiceState::Offline]);
    }
}
