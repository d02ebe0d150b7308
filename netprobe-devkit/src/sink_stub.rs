/*!
Sink et notifier factices

`ScriptedSink` renvoie `Delivered` par défaut ; une issue peut être programmée
par signal_id, ou pour toutes les alarmes. Toutes les tentatives sont
enregistrées dans l'ordre d'arrivée.
*/

use async_trait::async_trait;
use netprobe_core::{AlarmEvent, AlarmSink, ChangeEvent, Notifier, NotifyError, SubmitOutcome};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ScriptedSink {
    default: Arc<Mutex<Option<SubmitOutcome>>>,
    per_signal: Arc<Mutex<HashMap<String, SubmitOutcome>>>,
    attempts: Arc<Mutex<Vec<AlarmEvent>>>,
}

impl ScriptedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue renvoyée pour toutes les alarmes sans règle spécifique
    pub fn respond_all(&self, outcome: SubmitOutcome) {
        *self.default.lock() = Some(outcome);
    }

    pub fn respond_for(&self, signal_id: &str, outcome: SubmitOutcome) {
        self.per_signal.lock().insert(signal_id.to_string(), outcome);
    }

    /// Remet toutes les réponses à `Delivered` (ex: store revenu)
    pub fn recover(&self) {
        *self.default.lock() = None;
        self.per_signal.lock().clear();
    }

    pub fn attempts(&self) -> Vec<AlarmEvent> {
        self.attempts.lock().clone()
    }

    pub fn attempted_signals(&self) -> Vec<String> {
        self.attempts.lock().iter().map(|a| a.signal_id.clone()).collect()
    }
}

#[async_trait]
impl AlarmSink for ScriptedSink {
    async fn submit(&self, alarm: &AlarmEvent) -> SubmitOutcome {
        self.attempts.lock().push(alarm.clone());
        if let Some(outcome) = self.per_signal.lock().get(&alarm.signal_id) {
            return outcome.clone();
        }
        self.default.lock().clone().unwrap_or(SubmitOutcome::Delivered)
    }
}

/// Capture tous les événements publiés vers le fan-out
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
