/**
 * FAN-OUT DES CHANGEMENTS - Notification des abonnés externes
 *
 * RÔLE : Point de sortie unique `notify(event)` pour les alarmes créées et les
 * changements de statut. La diffusion temps réel vers les navigateurs est hors
 * du pipeline : on publie sur MQTT et la couche temps réel s'y abonne.
 *
 * TOPICS :
 * - netprobe/alarms/created@v1
 * - netprobe/status/changed@v1
 */

use async_trait::async_trait;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde::Serialize;
use std::time::Duration;
use tokio::task;
use tracing::{debug, info, warn};

use crate::models::{ServiceStatus, StoredAlarm};

pub const ALARM_CREATED_TOPIC: &str = "netprobe/alarms/created@v1";
pub const STATUS_CHANGED_TOPIC: &str = "netprobe/status/changed@v1";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("MQTT publish failed: {0}")]
    Publish(#[from] rumqttc::ClientError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChangeEvent {
    AlarmCreated(StoredAlarm),
    StatusChanged(ServiceStatus),
}

impl ChangeEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            ChangeEvent::AlarmCreated(_) => ALARM_CREATED_TOPIC,
            ChangeEvent::StatusChanged(_) => STATUS_CHANGED_TOPIC,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), NotifyError>;
}

/// Notifier sans abonnés : trace seulement (pas de broker MQTT configuré)
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        debug!(topic = event.topic(), ?event, "change event (no subscribers configured)");
        Ok(())
    }
}

/// Publie chaque événement en JSON sur le broker MQTT (QoS 1, non retenu)
#[derive(Clone)]
pub struct MqttNotifier {
    client: AsyncClient,
}

impl MqttNotifier {
    /// Crée le client et lance la boucle d'événements en tâche de fond.
    /// Doit être appelé depuis un runtime tokio.
    pub fn connect(client_prefix: &str, host: &str, port: u16) -> Self {
        let client_id = format!("{client_prefix}-{}", uuid::Uuid::new_v4());
        let mut opts = MqttOptions::new(client_id, host, port);
        opts.set_keep_alive(Duration::from_secs(15));
        let (client, mut eventloop) = AsyncClient::new(opts, 10);

        info!(host, port, "MQTT change fan-out enabled");
        task::spawn(async move {
            loop {
                if let Err(e) = eventloop.poll().await {
                    warn!("MQTT fan-out error: {e:?}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        });

        Self { client }
    }
}

#[async_trait]
impl Notifier for MqttNotifier {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(event)?;
        self.client
            .publish(event.topic(), QoS::AtLeastOnce, false, payload)
            .await?;
        Ok(())
    }
}
