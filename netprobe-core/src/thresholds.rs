/**
 * ÉVALUATEUR DE SEUILS - Télémétrie → alarmes
 *
 * RÔLE : Transforme un échantillon en zéro, une ou plusieurs alarmes. Fonction pure :
 * pas d'I/O, pas d'état, même entrée = même liste dans le même ordre.
 *
 * POLITIQUES : `PerInterface` (seuils fins erreurs/discards/trafic) ou `Aggregated`
 * (somme erreurs in+out par interface). Une seule est active par évaluateur, la règle
 * "interface down" est commune aux deux.
 */

use serde::{Deserialize, Serialize};

use crate::models::{AlarmEvent, Interface, Severity, TelemetrySample};

pub const CPU_HIGH: f64 = 80.0;
pub const CPU_CRITICAL: f64 = 90.0;
pub const MEMORY_HIGH: f64 = 85.0;
pub const MEMORY_CRITICAL: f64 = 95.0;
pub const FAN_HIGH_RPM: f64 = 9500.0;
pub const FAN_LOW_RPM: f64 = 7000.0;
pub const IN_ERROR_PACKETS: f64 = 5.0;
pub const OUT_ERROR_PACKETS: f64 = 5.0;
pub const IN_DISCARDED_PACKETS: f64 = 5.0;
pub const TRAFFIC_BPS: f64 = 1_500_000_000.0;
pub const AGGREGATED_ERROR_PACKETS: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationPolicy {
    #[default]
    PerInterface,
    Aggregated,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    policy: EvaluationPolicy,
}

impl Evaluator {
    pub fn new(policy: EvaluationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EvaluationPolicy {
        self.policy
    }

    /// Évalue toutes les règles indépendamment.
    /// Ordre : cpu, mémoire, ventilateurs (high puis low), interfaces dans l'ordre reçu.
    pub fn evaluate(&self, sample: &TelemetrySample) -> Vec<AlarmEvent> {
        let mut alarms = Vec::new();
        let mut out = AlarmWriter { sample, timestamp: sample.timestamp.clone().unwrap_or_else(crate::now_rfc3339), alarms: &mut alarms };
        let dynamic = &sample.dynamic;

        let cpu = dynamic.cpu.unwrap_or(0.0);
        if cpu > CPU_HIGH {
            let severity = if cpu > CPU_CRITICAL { Severity::Critical } else { Severity::Major };
            out.push("cpu_high".into(), format!("CPU usage high: {cpu}%"), severity, "cpu", cpu);
        }

        let memory = dynamic.memory.unwrap_or(0.0);
        if memory > MEMORY_HIGH {
            let severity = if memory > MEMORY_CRITICAL { Severity::Critical } else { Severity::Warning };
            out.push("memory_high".into(), format!("Memory usage high: {memory}%"), severity, "memory", memory);
        }

        for fan in &dynamic.fans {
            // pas de mesure = pas d'alarme, ni high ni low
            let Some(rpm) = fan.speed_rpm else { continue };
            if rpm > FAN_HIGH_RPM {
                out.push(
                    format!("fan_{}_high", fan.id),
                    format!("Fan {} running too fast: {rpm} RPM", fan.id),
                    Severity::Warning,
                    "fan_speed_rpm",
                    rpm,
                );
            }
            if rpm < FAN_LOW_RPM {
                out.push(
                    format!("fan_{}_low", fan.id),
                    format!("Fan {} running too slow: {rpm} RPM", fan.id),
                    Severity::Warning,
                    "fan_speed_rpm",
                    rpm,
                );
            }
        }

        for iface in &dynamic.interfaces {
            if iface.oper_state.as_deref() == Some("down") {
                out.push(
                    format!("iface_{}_down", iface.name),
                    format!("Interface {} is down", iface.name),
                    Severity::Major,
                    "oper_state",
                    "down",
                );
            }
            match self.policy {
                EvaluationPolicy::PerInterface => per_interface(iface, &mut out),
                EvaluationPolicy::Aggregated => aggregated(iface, &mut out),
            }
        }

        alarms
    }
}

struct AlarmWriter<'a> {
    sample: &'a TelemetrySample,
    timestamp: String,
    alarms: &'a mut Vec<AlarmEvent>,
}

impl AlarmWriter<'_> {
    fn device(&self) -> Option<String> {
        if self.sample.device.is_empty() { None } else { Some(self.sample.device.clone()) }
    }

    fn push(&mut self, signal_id: String, signal_label: String, severity: Severity, metric: &str, value: impl ToString) {
        let device = self.device();
        self.alarms.push(AlarmEvent {
            signal_id,
            signal_label,
            device,
            severity: Some(severity),
            metric: Some(metric.to_string()),
            value: Some(value.to_string()),
            timestamp: self.timestamp.clone(),
        });
    }
}

fn per_interface(iface: &Interface, out: &mut AlarmWriter<'_>) {
    let name = &iface.name;
    let stats = &iface.statistics;
    let traffic = &iface.traffic_rate;

    let in_errors = stats.in_error_packets.unwrap_or(0.0);
    if in_errors > IN_ERROR_PACKETS {
        out.push(
            format!("iface_{name}_in_error"),
            format!("Interface {name} has too many input errors (CRC-CheckSum): {in_errors}"),
            Severity::Minor,
            "in_error_packets",
            in_errors,
        );
    }
    let out_errors = stats.out_error_packets.unwrap_or(0.0);
    if out_errors > OUT_ERROR_PACKETS {
        out.push(
            format!("iface_{name}_out_error"),
            format!("Interface {name} has too many output errors (abandoned): {out_errors}"),
            Severity::Minor,
            "out_error_packets",
            out_errors,
        );
    }
    let discarded = stats.in_discarded_packets.unwrap_or(0.0);
    if discarded > IN_DISCARDED_PACKETS {
        out.push(
            format!("iface_{name}_in_discarded"),
            format!("Interface {name} discards too many input packets (buffer overflow): {discarded}"),
            Severity::Minor,
            "in_discarded_packets",
            discarded,
        );
    }
    let in_bps = traffic.in_bps.unwrap_or(0.0);
    if in_bps > TRAFFIC_BPS {
        out.push(
            format!("iface_{name}_in_traffic"),
            format!("Interface {name} inbound traffic too high: {in_bps} bps"),
            Severity::Warning,
            "in_bps",
            in_bps,
        );
    }
    let out_bps = traffic.out_bps.unwrap_or(0.0);
    if out_bps > TRAFFIC_BPS {
        out.push(
            format!("iface_{name}_out_traffic"),
            format!("Interface {name} outbound traffic too high: {out_bps} bps"),
            Severity::Warning,
            "out_bps",
            out_bps,
        );
    }
}

fn aggregated(iface: &Interface, out: &mut AlarmWriter<'_>) {
    let stats = &iface.statistics;
    let total = stats.in_error_packets.unwrap_or(0.0) + stats.out_error_packets.unwrap_or(0.0);
    if total > AGGREGATED_ERROR_PACKETS {
        out.push(
            "interface_errors".into(),
            format!("Interface {} error count too high: {total} packets", iface.name),
            Severity::Major,
            "interface_errors",
            total,
        );
    }
}
