use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Erreurs de décodage d'un message brut venant du broker
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("payload is not a telemetry sample: {0}")]
    Json(#[from] serde_json::Error),
}

// Structure basée sur le message publié par le simulateur sur telemetry_exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    #[serde(default, deserialize_with = "null_as_default")]
    pub device: String,
    #[serde(default)]
    pub timestamp: Option<String>,     // ISO-8601, absent = heure de réception
    #[serde(default, alias = "data", deserialize_with = "null_as_default")]
    pub dynamic: Dynamic,              // le producteur terrain publie sous "data"
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dynamic {
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub memory: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fans: Vec<Fan>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interfaces: Vec<Interface>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fan {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,                  // absent ou null = ""
    #[serde(rename = "speed-rpm", default)]
    pub speed_rpm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "oper-state", default)]
    pub oper_state: Option<String>,  // up, down, ...
    #[serde(default, deserialize_with = "null_as_default")]
    pub statistics: Statistics,
    #[serde(rename = "traffic-rate", default, deserialize_with = "null_as_default")]
    pub traffic_rate: TrafficRate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(rename = "in-error-packets", default)]
    pub in_error_packets: Option<f64>,
    #[serde(rename = "out-error-packets", default)]
    pub out_error_packets: Option<f64>,
    #[serde(rename = "in-discarded-packets", default)]
    pub in_discarded_packets: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficRate {
    #[serde(rename = "in-bps", default)]
    pub in_bps: Option<f64>,
    #[serde(rename = "out-bps", default)]
    pub out_bps: Option<f64>,
}

impl TelemetrySample {
    /// Décode un payload AMQP (UTF-8 + JSON) et fixe l'horodatage de réception s'il manque.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let txt = std::str::from_utf8(payload)?;
        let mut sample: TelemetrySample = serde_json::from_str(txt)?;
        if sample.timestamp.is_none() {
            sample.timestamp = Some(crate::now_rfc3339());
        }
        Ok(sample)
    }
}

// null côté producteur = champ absent
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!("unsupported fan id: {other}"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Warning,
    Minor,
    Info,
}

/// Alarme dérivée d'un échantillon, immuable une fois créée
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmEvent {
    pub signal_id: String,
    pub signal_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub timestamp: String,
}

/// Alarme telle que renvoyée par le store (201)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAlarm {
    pub id: u64,
    #[serde(flatten)]
    pub alarm: AlarmEvent,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Unknown,
    Online,
    Error,
    Offline,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Unknown => "unknown",
            ServiceState::Online => "online",
            ServiceState::Error => "error",
            ServiceState::Offline => "offline",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ServiceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(ServiceState::Unknown),
            "online" => Ok(ServiceState::Online),
            "error" => Ok(ServiceState::Error),
            "offline" => Ok(ServiceState::Offline),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub status: ServiceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fills_missing_timestamp() {
        let sample = TelemetrySample::decode(br#"{"device":"r1","dynamic":{"cpu":12}}"#).unwrap();
        assert_eq!(sample.device, "r1");
        assert_eq!(sample.dynamic.cpu, Some(12.0));
        assert!(sample.timestamp.is_some());
    }

    #[test]
    fn test_decode_accepts_producer_layout() {
        let raw = br#"{
            "timestamp": "2025-01-10T08:00:00",
            "device": "router-core-01",
            "data": {
                "cpu": 55, "memory": 61,
                "fans": [{"id": 1, "speed": 70, "speed-rpm": 8800}],
                "interfaces": [{"name": "ethernet-1/1", "oper-state": "up",
                                "statistics": {"in-error-packets": 3, "in-packets": 120},
                                "traffic-rate": {"in-bps": 900000000}}]
            }
        }"#;
        let sample = TelemetrySample::decode(raw).unwrap();
        assert_eq!(sample.timestamp.as_deref(), Some("2025-01-10T08:00:00"));
        assert_eq!(sample.dynamic.fans[0].id, "1");
        assert_eq!(sample.dynamic.fans[0].speed_rpm, Some(8800.0));
        let iface = &sample.dynamic.interfaces[0];
        assert_eq!(iface.oper_state.as_deref(), Some("up"));
        assert_eq!(iface.statistics.in_error_packets, Some(3.0));
        assert_eq!(iface.traffic_rate.out_bps, None);
    }

    #[test]
    fn test_decode_treats_null_as_missing() {
        use crate::thresholds::Evaluator;

        let payloads: [&[u8]; 6] = [
            br#"{"device":"r1","dynamic":{"cpu":95,"fans":null,"interfaces":null}}"#,
            br#"{"device":"r1","dynamic":{"cpu":95,"interfaces":[{"name":"eth0","statistics":null,"traffic-rate":null}]}}"#,
            br#"{"device":"r1","dynamic":{"cpu":95,"interfaces":[{"name":null,"oper-state":"up"}]}}"#,
            br#"{"device":"r1","dynamic":{"cpu":95,"fans":[{"speed-rpm":8000},{"id":null,"speed-rpm":8000}]}}"#,
            br#"{"device":"r1","dynamic":{"cpu":95,"interfaces":[{"oper-state":"up"}]}}"#,
            br#"{"device":null,"dynamic":null}"#,
        ];
        for (i, raw) in payloads.iter().enumerate() {
            let sample = TelemetrySample::decode(raw).unwrap_or_else(|e| panic!("payload {i}: {e}"));
            let ids: Vec<String> = Evaluator::default().evaluate(&sample).into_iter().map(|a| a.signal_id).collect();
            let expected: Vec<&str> = if i == 5 { vec![] } else { vec!["cpu_high"] };
            assert_eq!(ids, expected, "payload {i}");
        }

        let sample = TelemetrySample::decode(payloads[1]).unwrap();
        assert_eq!(sample.dynamic.interfaces[0].statistics, Statistics::default());
        let sample = TelemetrySample::decode(payloads[3]).unwrap();
        assert_eq!(sample.dynamic.fans[1].id, "");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(TelemetrySample::decode(&[0xff, 0xfe]), Err(DecodeError::Utf8(_))));
        assert!(matches!(TelemetrySample::decode(b"not json"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_alarm_wire_format() {
        let alarm = AlarmEvent {
            signal_id: "cpu_high".into(),
            signal_label: "CPU usage high: 95%".into(),
            device: Some("r1".into()),
            severity: Some(Severity::Critical),
            metric: Some("cpu".into()),
            value: None,
            timestamp: "2025-01-10T08:00:00Z".into(),
        };
        let json = serde_json::to_value(&alarm).unwrap();
        assert_eq!(json["severity"], "critical");
        assert!(json.get("value").is_none());
    }
}
