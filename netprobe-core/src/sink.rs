use async_trait::async_trait;

use crate::models::AlarmEvent;

/// Issue d'une soumission d'alarme au store.
/// `Paused` et `Failed` mènent au même traitement côté consommateur (nack différé).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Delivered,
    Paused,
    Failed(String),
}

impl SubmitOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SubmitOutcome::Delivered)
    }
}

/// Destination des alarmes dérivées
#[async_trait]
pub trait AlarmSink: Send + Sync {
    async fn submit(&self, alarm: &AlarmEvent) -> SubmitOutcome;
}
