//! Health reporting for the consumer itself
//!
//! Only transitions leave the process: the last status is kept in a
//! `StatusBoard` and a change is POSTed to the status collector, which owns
//! the fan-out. The local notifier publishes the change only when the
//! collector could not take it, so each transition is published once.
//! Every failure is logged and swallowed.

use netprobe_core::{ChangeEvent, Notifier, ServiceState, StatusBoard};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    service: &'a str,
    status: ServiceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

#[derive(Clone)]
pub struct HealthReporter {
    service: String,
    board: StatusBoard,
    notifier: Arc<dyn Notifier>,
    client: reqwest::Client,
    url: String,
}

impl HealthReporter {
    pub fn new(
        service: &str,
        status_base_url: &str,
        timeout: Duration,
        notifier: Arc<dyn Notifier>,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            service: service.to_string(),
            board: StatusBoard::new(),
            notifier,
            client,
            url: format!("{}/api/app-status", status_base_url.trim_end_matches('/')),
        })
    }

    pub fn current(&self) -> Option<ServiceState> {
        self.board.get(&self.service).map(|r| r.status)
    }

    /// Returns `true` when the status changed and was forwarded.
    pub async fn report(&self, status: ServiceState, message: Option<&str>) -> bool {
        let Some(record) = self.board.record(&self.service, status, message.map(str::to_string)) else {
            return false;
        };
        info!(service = %self.service, %status, "health status changed");

        let body = StatusReport { service: &self.service, status, message };
        let collected = match self.client.post(&self.url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(service = %self.service, status = %resp.status(), "status collector rejected report");
                false
            }
            Err(e) => {
                warn!(service = %self.service, "failed to report status: {e}");
                false
            }
        };

        if !collected {
            if let Err(e) = self.notifier.notify(&ChangeEvent::StatusChanged(record)).await {
                warn!(service = %self.service, "failed to notify status change: {e}");
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use netprobe_devkit::RecordingNotifier;
    use parking_lot::Mutex;
    use serde_json::Value;
    use tokio::net::TcpListener;

    async fn collector(received: Arc<Mutex<Vec<Value>>>) -> String {
        let app = Router::new().route(
            "/api/app-status",
            post(move |Json(body): Json<Value>| async move {
                received.lock().push(body);
                StatusCode::OK
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn reporter(notifier: RecordingNotifier) -> HealthReporter {
        // aucun collecteur n'écoute : le POST échoue, la transition part par le notifier local
        HealthReporter::new("consumer", "http://127.0.0.1:9", Duration::from_millis(200), Arc::new(notifier)).unwrap()
    }

    #[tokio::test]
    async fn test_repeated_status_is_forwarded_once() {
        let notifier = RecordingNotifier::new();
        let health = reporter(notifier.clone());
        assert!(health.report(ServiceState::Online, None).await);
        assert!(!health.report(ServiceState::Online, None).await);
        assert_eq!(notifier.count(), 1);
        assert_eq!(health.current(), Some(ServiceState::Online));
    }

    #[tokio::test]
    async fn test_each_transition_is_forwarded() {
        let notifier = RecordingNotifier::new();
        let health = reporter(notifier.clone());
        health.report(ServiceState::Error, Some("connection refused")).await;
        health.report(ServiceState::Error, Some("connection refused")).await;
        health.report(ServiceState::Online, None).await;
        health.report(ServiceState::Offline, None).await;
        let states: Vec<ServiceState> = notifier
            .events()
            .into_iter()
            .map(|e| match e {
                ChangeEvent::StatusChanged(s) => s.status,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(states, vec![ServiceState::Error, ServiceState::Online, ServiceState::Offline]);
    }

    #[tokio::test]
    async fn test_collected_transition_is_not_republished() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let base = collector(received.clone()).await;
        let notifier = RecordingNotifier::new();
        let health = HealthReporter::new("consumer", &base, Duration::from_secs(2), Arc::new(notifier.clone())).unwrap();

        assert!(health.report(ServiceState::Online, None).await);
        assert!(health.report(ServiceState::Error, Some("channel closed")).await);
        assert!(!health.report(ServiceState::Error, Some("channel closed")).await);

        // le collecteur publie lui-même : rien en local
        assert_eq!(notifier.count(), 0);
        let bodies = received.lock().clone();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[1]["status"], "error");
        assert_eq!(bodies[1]["message"], "channel closed");
    }
}
