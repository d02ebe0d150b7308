/*!
Fake broker acker pour tester la discipline ack/nack sans RabbitMQ

Chaque verdict est enregistré avec son `tokio::time::Instant`, ce qui permet de
mesurer le cooldown avec une horloge tokio en pause.
*/

use async_trait::async_trait;
use netprobe_core::{AckError, DeliveryAcker};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckCall {
    Ack(Instant),
    NackRequeue(Instant),
}

/// Acker factice, clonable : tous les clones partagent le même journal
#[derive(Clone, Default)]
pub struct FakeAcker {
    calls: Arc<Mutex<Vec<AckCall>>>,
    refuse: Arc<Mutex<bool>>,
}

impl FakeAcker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simule un canal fermé : les verdicts suivants échouent (mais restent journalisés)
    pub fn refuse_verdicts(&self) {
        *self.refuse.lock() = true;
    }

    pub fn calls(&self) -> Vec<AckCall> {
        self.calls.lock().clone()
    }

    pub fn ack_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| matches!(c, AckCall::Ack(_))).count()
    }

    pub fn nack_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| matches!(c, AckCall::NackRequeue(_))).count()
    }

    /// Instant du dernier nack(requeue), s'il y en a eu un
    pub fn last_nack_at(&self) -> Option<Instant> {
        self.calls.lock().iter().rev().find_map(|c| match c {
            AckCall::NackRequeue(at) => Some(*at),
            AckCall::Ack(_) => None,
        })
    }

    fn push(&self, call: AckCall) -> Result<(), AckError> {
        self.calls.lock().push(call);
        if *self.refuse.lock() {
            return Err(AckError::ChannelClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryAcker for FakeAcker {
    async fn ack(&self) -> Result<(), AckError> {
        tracing::debug!("[fake-broker] ack");
        self.push(AckCall::Ack(Instant::now()))
    }

    async fn nack_requeue(&self) -> Result<(), AckError> {
        tracing::debug!("[fake-broker] nack requeue=true");
        self.push(AckCall::NackRequeue(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_acker_journal() {
        let acker = FakeAcker::new();
        acker.ack().await.unwrap();
        acker.nack_requeue().await.unwrap();
        assert_eq!(acker.ack_count(), 1);
        assert_eq!(acker.nack_count(), 1);
        assert!(acker.last_nack_at().is_some());

        let shared = acker.clone();
        shared.refuse_verdicts();
        assert!(acker.ack().await.is_err());
        assert_eq!(shared.calls().len(), 3);
    }
}
