//! HTTP alarm sink
//!
//! POSTs each alarm to `{alarm_api}/api/alarms`:
//! - 2xx → `Delivered`
//! - 503 → `Paused` (admission gate closed)
//! - anything else, network errors and timeouts → `Failed`

use async_trait::async_trait;
use netprobe_core::{AlarmEvent, AlarmSink, SubmitOutcome};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct HttpAlarmSink {
    client: reqwest::Client,
    url: String,
}

impl HttpAlarmSink {
    pub fn new(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/api/alarms", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl AlarmSink for HttpAlarmSink {
    async fn submit(&self, alarm: &AlarmEvent) -> SubmitOutcome {
        let response = match self.client.post(&self.url).json(alarm).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(signal_id = %alarm.signal_id, "alarm store unreachable: {e}");
                return SubmitOutcome::Failed(e.to_string());
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(signal_id = %alarm.signal_id, %status, "alarm delivered");
            SubmitOutcome::Delivered
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            debug!(signal_id = %alarm.signal_id, "alarm store paused");
            SubmitOutcome::Paused
        } else {
            warn!(signal_id = %alarm.signal_id, %status, "alarm store rejected alarm");
            SubmitOutcome::Failed(format!("alarm store answered {status}"))
        }
    }
}
