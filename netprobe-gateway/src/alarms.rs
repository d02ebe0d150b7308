/**
 * STORE D'ALARMES - Frontière d'ingestion
 *
 * RÔLE : Enregistre les alarmes acceptées par POST /api/alarms et les restitue.
 * La persistance réelle (CRUD, requêtes) est un service externe ; ce store mémoire
 * borné suffit à la frontière et aux tests.
 *
 * NOTE : aucune déduplication. Le consommateur livre au moins une fois, une
 * redélivrance crée donc une nouvelle alarme.
 */

use netprobe_core::{AlarmEvent, Severity, StoredAlarm};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::VecDeque;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

/// Interface commune des stores d'alarmes
pub trait AlarmStore: Send + Sync {
    fn create(&self, alarm: AlarmEvent) -> Result<StoredAlarm, StoreError>;
    fn list(&self) -> Result<Vec<StoredAlarm>, StoreError>;
}

/// Store mémoire borné : au-delà de `capacity`, les plus anciennes sont évincées
pub struct InMemoryAlarmStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

struct Inner {
    next_id: u64,
    alarms: VecDeque<StoredAlarm>,
}

impl InMemoryAlarmStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { next_id: 1, alarms: VecDeque::new() }),
            capacity: capacity.max(1),
        }
    }
}

impl AlarmStore for InMemoryAlarmStore {
    fn create(&self, alarm: AlarmEvent) -> Result<StoredAlarm, StoreError> {
        let mut inner = self.inner.lock();
        let stored = StoredAlarm {
            id: inner.next_id,
            alarm,
            created_at: netprobe_core::now_rfc3339(),
        };
        inner.next_id += 1;
        if inner.alarms.len() == self.capacity {
            inner.alarms.pop_front();
        }
        inner.alarms.push_back(stored.clone());
        Ok(stored)
    }

    fn list(&self) -> Result<Vec<StoredAlarm>, StoreError> {
        Ok(self.inner.lock().alarms.iter().cloned().collect())
    }
}

/// Corps accepté par POST /api/alarms.
/// `metric` peut tenir lieu de `signal_id`, `message` de `signal_label`.
#[derive(Debug, Deserialize)]
pub struct AlarmIngest {
    pub signal_id: Option<String>,
    pub signal_label: Option<String>,
    pub metric: Option<String>,
    pub message: Option<String>,
    pub device: Option<String>,
    pub severity: Option<Severity>,
    pub value: Option<serde_json::Value>,
    pub timestamp: Option<String>,
}

impl AlarmIngest {
    /// Normalise vers une `AlarmEvent` ; `None` si aucun identifiant n'est fourni
    pub fn into_alarm(self) -> Option<AlarmEvent> {
        let signal_id = self.signal_id.or_else(|| self.metric.clone())?;
        let signal_label = self
            .signal_label
            .or(self.message)
            .unwrap_or_else(|| signal_id.clone());
        let value = self.value.map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        Some(AlarmEvent {
            signal_id,
            signal_label,
            device: self.device,
            severity: self.severity,
            metric: self.metric,
            value,
            timestamp: self.timestamp.unwrap_or_else(netprobe_core::now_rfc3339),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ingest(v: serde_json::Value) -> AlarmIngest {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_metric_and_message_aliases() {
        let alarm = ingest(json!({"metric": "cpu", "message": "CPU usage high: 91%", "value": 91}))
            .into_alarm()
            .unwrap();
        assert_eq!(alarm.signal_id, "cpu");
        assert_eq!(alarm.signal_label, "CPU usage high: 91%");
        assert_eq!(alarm.value.as_deref(), Some("91"));
        assert!(!alarm.timestamp.is_empty());
    }

    #[test]
    fn test_missing_identifier_is_rejected() {
        assert!(ingest(json!({"signal_label": "orphan"})).into_alarm().is_none());
    }

    #[test]
    fn test_store_assigns_ids_and_evicts() {
        let store = InMemoryAlarmStore::new(2);
        for id in ["a", "b", "c"] {
            store.create(ingest(json!({"signal_id": id})).into_alarm().unwrap()).unwrap();
        }
        let list = store.list().unwrap();
        assert_eq!(list.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(list[1].alarm.signal_id, "c");
    }
}
