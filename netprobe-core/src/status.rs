use std::collections::HashMap;

use crate::models::{ServiceState, ServiceStatus};
use crate::state::{new_state, SharedMap};

/// Dernier statut connu par service. Une mise à jour n'est retenue (et donc
/// propagée) que si le statut change.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    records: SharedMap<String, ServiceStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self { records: new_state(HashMap::new()) }
    }

    /// Tableau pré-rempli en `unknown` pour les services attendus
    pub fn seeded<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let board = Self::new();
        let now = crate::now_rfc3339();
        {
            let mut records = board.records.lock();
            for name in services {
                let name = name.into();
                records.insert(name.clone(), ServiceStatus {
                    name,
                    status: ServiceState::Unknown,
                    message: None,
                    timestamp: now.clone(),
                });
            }
        }
        board
    }

    /// Enregistre `status` pour `service`.
    /// Retourne `Some(record)` uniquement sur transition ; `None` si le statut est identique.
    pub fn record(&self, service: &str, status: ServiceState, message: Option<String>) -> Option<ServiceStatus> {
        let mut records = self.records.lock();
        if records.get(service).map(|r| r.status) == Some(status) {
            return None;
        }
        let rec = ServiceStatus {
            name: service.to_string(),
            status,
            message,
            timestamp: crate::now_rfc3339(),
        };
        records.insert(service.to_string(), rec.clone());
        Some(rec)
    }

    pub fn get(&self, service: &str) -> Option<ServiceStatus> {
        self.records.lock().get(service).cloned()
    }

    /// Tous les enregistrements, triés par nom de service
    pub fn all(&self) -> Vec<ServiceStatus> {
        let mut list: Vec<ServiceStatus> = self.records.lock().values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
