/*!
Fixtures de télémétrie

Construit des messages au format publié sur `telemetry_exchange`.
*/

use netprobe_core::TelemetrySample;
use serde_json::{json, Value};

pub struct TelemetryBuilder {
    device: String,
    timestamp: Option<String>,
    cpu: Option<f64>,
    memory: Option<f64>,
    fans: Vec<Value>,
    interfaces: Vec<Value>,
}

impl TelemetryBuilder {
    pub fn new<S: Into<String>>(device: S) -> Self {
        Self {
            device: device.into(),
            timestamp: None,
            cpu: None,
            memory: None,
            fans: Vec::new(),
            interfaces: Vec::new(),
        }
    }

    pub fn timestamp<S: Into<String>>(mut self, ts: S) -> Self {
        self.timestamp = Some(ts.into());
        self
    }

    pub fn cpu(mut self, cpu: f64) -> Self {
        self.cpu = Some(cpu);
        self
    }

    pub fn memory(mut self, memory: f64) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn fan(mut self, id: u32, speed_rpm: f64) -> Self {
        self.fans.push(json!({"id": id, "speed-rpm": speed_rpm}));
        self
    }

    pub fn interface_down<S: Into<String>>(mut self, name: S) -> Self {
        self.interfaces.push(json!({"name": name.into(), "oper-state": "down"}));
        self
    }

    /// Interface arbitraire (statistics / traffic-rate au format brut)
    pub fn interface(mut self, iface: Value) -> Self {
        self.interfaces.push(iface);
        self
    }

    pub fn to_json(&self) -> Value {
        let mut dynamic = json!({"fans": self.fans, "interfaces": self.interfaces});
        if let Some(cpu) = self.cpu {
            dynamic["cpu"] = json!(cpu);
        }
        if let Some(memory) = self.memory {
            dynamic["memory"] = json!(memory);
        }
        let mut msg = json!({"device": self.device, "dynamic": dynamic});
        if let Some(ts) = &self.timestamp {
            msg["timestamp"] = json!(ts);
        }
        msg
    }

    /// Payload brut tel que livré par le broker
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    pub fn build(&self) -> TelemetrySample {
        serde_json::from_value(self.to_json()).unwrap_or_else(|e| panic!("invalid telemetry fixture: {e}"))
    }
}
