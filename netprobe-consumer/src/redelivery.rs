//! Redelivery controller
//!
//! One verdict per broker delivery:
//! - decoded, evaluated and every derived alarm `Delivered` → ack
//! - anything else (undecodable payload, `Paused`, `Failed`) → cooldown, then
//!   nack with requeue so the broker redelivers later
//!
//! Alarms are at-least-once: a requeued message re-submits every alarm it
//! derives, including those that were already accepted.

use futures::future::join_all;
use netprobe_core::{AckError, AlarmSink, DeliveryAcker, Evaluator, SubmitOutcome, TelemetrySample};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::shutdown::Shutdown;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Acked { alarms: usize },
    Requeued(RequeueReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequeueReason {
    Malformed(String),
    Undelivered { paused: usize, failed: usize, total: usize },
}

pub struct RedeliveryController {
    evaluator: Evaluator,
    sink: Arc<dyn AlarmSink>,
    cooldown: Duration,
    shutdown: Shutdown,
}

impl RedeliveryController {
    pub fn new(evaluator: Evaluator, sink: Arc<dyn AlarmSink>, cooldown: Duration, shutdown: Shutdown) -> Self {
        Self { evaluator, sink, cooldown, shutdown }
    }

    /// Processes one delivery and settles it exactly once on `acker`.
    pub async fn handle(&self, payload: &[u8], acker: &dyn DeliveryAcker) -> Result<Verdict, AckError> {
        let verdict = self.process(payload).await;
        match &verdict {
            Verdict::Acked { alarms } => {
                acker.ack().await?;
                debug!(alarms, "message acknowledged");
            }
            Verdict::Requeued(reason) => {
                warn!(?reason, cooldown_secs = self.cooldown.as_secs(), "message not processed, requeueing after cooldown");
                self.cool_down().await;
                acker.nack_requeue().await?;
            }
        }
        Ok(verdict)
    }

    async fn process(&self, payload: &[u8]) -> Verdict {
        let sample = match TelemetrySample::decode(payload) {
            Ok(sample) => sample,
            Err(e) => return Verdict::Requeued(RequeueReason::Malformed(e.to_string())),
        };

        let alarms = self.evaluator.evaluate(&sample);
        if alarms.is_empty() {
            debug!(device = %sample.device, "no alarms triggered");
            return Verdict::Acked { alarms: 0 };
        }
        info!(device = %sample.device, count = alarms.len(), "alarms triggered");

        // toutes les alarmes sont tentées, même si l'une échoue
        let outcomes = join_all(alarms.iter().map(|alarm| self.sink.submit(alarm))).await;

        let mut paused = 0;
        let mut failed = 0;
        for (alarm, outcome) in alarms.iter().zip(&outcomes) {
            match outcome {
                SubmitOutcome::Delivered => {}
                SubmitOutcome::Paused => paused += 1,
                SubmitOutcome::Failed(reason) => {
                    debug!(signal_id = %alarm.signal_id, %reason, "alarm not delivered");
                    failed += 1;
                }
            }
        }

        if paused + failed == 0 {
            Verdict::Acked { alarms: alarms.len() }
        } else {
            Verdict::Requeued(RequeueReason::Undelivered { paused, failed, total: alarms.len() })
        }
    }

    /// Cooldown before nack; cut short by shutdown.
    async fn cool_down(&self) {
        let mut shutdown = self.shutdown.clone();
        if shutdown.is_triggered() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.cooldown) => {}
            _ = shutdown.wait() => info!("shutdown during cooldown, requeueing now"),
        }
    }
}
