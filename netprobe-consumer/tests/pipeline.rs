//! Consumer against a live gateway: the gate decision made over HTTP must
//! turn into a delayed requeue on the broker side, and reopening the gate must
//! let the redelivered message through. A store that cannot persist answers
//! 500, which the consumer treats as a failed delivery.

use netprobe_consumer::{HttpAlarmSink, RedeliveryController, RequeueReason, Shutdown, Verdict};
use netprobe_core::{AdmissionGate, AlarmEvent, AlarmSink, Evaluator, LogNotifier, StatusBoard, StoredAlarm, SubmitOutcome};
use netprobe_devkit::{FakeAcker, TelemetryBuilder};
use netprobe_gateway::{serve, AlarmStore, AppState, InMemoryAlarmStore, StoreError};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

struct UnwritableStore;

impl AlarmStore for UnwritableStore {
    fn create(&self, _alarm: AlarmEvent) -> Result<StoredAlarm, StoreError> {
        Err(StoreError::Persistence("database unavailable".into()))
    }

    fn list(&self) -> Result<Vec<StoredAlarm>, StoreError> {
        Ok(Vec::new())
    }
}

async fn start_gateway() -> (String, AdmissionGate) {
    start_gateway_with(Arc::new(InMemoryAlarmStore::new(100))).await
}

async fn start_gateway_with(store: Arc<dyn AlarmStore>) -> (String, AdmissionGate) {
    let gate = AdmissionGate::new("consumer");
    let app_state = AppState {
        gate: gate.clone(),
        board: StatusBoard::seeded(["producer", "consumer"]),
        store,
        notifier: Arc::new(LogNotifier),
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, app_state));
    (format!("http://{addr}"), gate)
}

async fn control(base: &str, action: &str) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/service-control"))
        .json(&json!({"service": "consumer", "action": action}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

async fn stored_alarms(base: &str) -> Vec<Value> {
    reqwest::get(format!("{base}/api/alarms")).await.unwrap().json().await.unwrap()
}

#[tokio::test]
async fn test_closed_gate_is_seen_as_paused() {
    let (base, gate) = start_gateway().await;
    let sink = HttpAlarmSink::new(&base, Duration::from_secs(2)).unwrap();
    let alarm = Evaluator::default().evaluate(&TelemetryBuilder::new("r1").cpu(95.0).build()).remove(0);

    control(&base, "stop").await;
    assert!(!gate.is_open());
    assert_eq!(sink.submit(&alarm).await, SubmitOutcome::Paused);

    control(&base, "start").await;
    assert_eq!(sink.submit(&alarm).await, SubmitOutcome::Delivered);
}

#[tokio::test]
async fn test_paused_message_is_requeued_then_accepted() {
    let (base, _gate) = start_gateway().await;
    let sink = Arc::new(HttpAlarmSink::new(&base, Duration::from_secs(2)).unwrap());
    let cooldown = Duration::from_millis(200);
    let controller = RedeliveryController::new(Evaluator::default(), sink, cooldown, Shutdown::never());
    let payload = TelemetryBuilder::new("router-core-01").cpu(95.0).memory(92.0).to_bytes();

    control(&base, "stop").await;
    let acker = FakeAcker::new();
    let started = Instant::now();
    let verdict = controller.handle(&payload, &acker).await.unwrap();
    assert_eq!(
        verdict,
        Verdict::Requeued(RequeueReason::Undelivered { paused: 2, failed: 0, total: 2 })
    );
    assert!(started.elapsed() >= cooldown);
    assert_eq!((acker.ack_count(), acker.nack_count()), (0, 1));
    assert!(stored_alarms(&base).await.is_empty());

    // redélivrance après réouverture du gate
    control(&base, "start").await;
    let redelivery = FakeAcker::new();
    let verdict = controller.handle(&payload, &redelivery).await.unwrap();
    assert_eq!(verdict, Verdict::Acked { alarms: 2 });
    assert_eq!((redelivery.ack_count(), redelivery.nack_count()), (1, 0));

    let mut ids: Vec<String> = stored_alarms(&base)
        .await
        .iter()
        .map(|a| a["signal_id"].as_str().unwrap_or_default().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["cpu_high", "memory_high"]);
}

#[tokio::test]
async fn test_store_failure_is_failed_and_requeued() {
    let (base, _gate) = start_gateway_with(Arc::new(UnwritableStore)).await;
    let sink = Arc::new(HttpAlarmSink::new(&base, Duration::from_secs(2)).unwrap());
    let alarm = Evaluator::default().evaluate(&TelemetryBuilder::new("r1").cpu(95.0).build()).remove(0);
    assert!(matches!(sink.submit(&alarm).await, SubmitOutcome::Failed(_)));

    let cooldown = Duration::from_millis(100);
    let controller = RedeliveryController::new(Evaluator::default(), sink, cooldown, Shutdown::never());
    let acker = FakeAcker::new();
    let verdict = controller
        .handle(&TelemetryBuilder::new("r1").cpu(95.0).to_bytes(), &acker)
        .await
        .unwrap();
    assert_eq!(
        verdict,
        Verdict::Requeued(RequeueReason::Undelivered { paused: 0, failed: 1, total: 1 })
    );
    assert_eq!((acker.ack_count(), acker.nack_count()), (0, 1));
}
