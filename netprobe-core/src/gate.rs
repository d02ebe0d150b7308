use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Erreurs possibles sur une requête service-control
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Unknown service: {0}")]
    UnknownService(String),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateAction {
    Stop,
    Start,
}

impl std::str::FromStr for GateAction {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(GateAction::Stop),
            "start" => Ok(GateAction::Start),
            other => Err(GateError::UnknownAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Open,
    Closed,
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GateState::Open => "open",
            GateState::Closed => "closed",
        })
    }
}

/// Gate d'admission des alarmes, partagé par clonage (même drapeau atomique).
/// Ouvert au démarrage ; seul `control` le modifie, le dernier écrivain gagne.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    service: Arc<str>,
    open: Arc<AtomicBool>,
}

impl AdmissionGate {
    /// `service` est le nom accepté dans les requêtes de contrôle (ex: "consumer")
    pub fn new(service: &str) -> Self {
        Self {
            service: Arc::from(service),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn state(&self) -> GateState {
        if self.open.load(Ordering::Acquire) { GateState::Open } else { GateState::Closed }
    }

    pub fn is_open(&self) -> bool {
        self.state() == GateState::Open
    }

    /// Applique une requête de contrôle ; toute requête invalide laisse l'état intact.
    pub fn control(&self, service: &str, action: &str) -> Result<GateState, GateError> {
        if service != &*self.service {
            return Err(GateError::UnknownService(service.to_string()));
        }
        let action: GateAction = action.parse()?;
        Ok(self.apply(action))
    }

    pub fn apply(&self, action: GateAction) -> GateState {
        let open = action == GateAction::Start;
        let previous = self.open.swap(open, Ordering::AcqRel);
        let state = self.state();
        if previous != open {
            info!(service = %self.service, %state, "admission gate changed");
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_starts_open() {
        let gate = AdmissionGate::new("consumer");
        assert_eq!(gate.state(), GateState::Open);
        assert!(gate.is_open());
    }

    #[test]
    fn test_stop_then_start() {
        let gate = AdmissionGate::new("consumer");
        assert_eq!(gate.control("consumer", "stop"), Ok(GateState::Closed));
        assert!(!gate.is_open());
        // clone = même drapeau
        let other = gate.clone();
        assert_eq!(other.state(), GateState::Closed);
        assert_eq!(other.control("consumer", "start"), Ok(GateState::Open));
        assert!(gate.is_open());
    }

    #[test]
    fn test_invalid_requests_do_not_change_state() {
        let gate = AdmissionGate::new("consumer");
        gate.apply(GateAction::Stop);
        assert_eq!(gate.control("producer", "start"), Err(GateError::UnknownService("producer".into())));
        assert_eq!(gate.control("consumer", "restart"), Err(GateError::UnknownAction("restart".into())));
        assert_eq!(gate.state(), GateState::Closed);
    }
}
