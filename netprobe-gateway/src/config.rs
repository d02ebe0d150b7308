use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    pub listen: SocketAddr,
    pub controlled_service: String,  // nom accepté par /api/service-control
    pub services: Vec<String>,       // pré-chargés en "unknown" dans /api/app-status
    pub max_alarms: usize,           // au-delà, les plus anciennes sont évincées
    pub mqtt: Option<MqttConf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            controlled_service: "consumer".into(),
            services: vec!["producer".into(), "consumer".into()],
            max_alarms: 10_000,
            mqtt: None,
        }
    }
}

pub async fn load_config() -> GatewayConfig {
    let path = std::env::var("NETPROBE_GATEWAY_CONFIG").unwrap_or_else(|_| "gateway.yaml".into());
    let mut cfg = load_file(&path).await;
    apply_env(&mut cfg, |key| std::env::var(key).ok());
    cfg
}

pub async fn load_file(path: &str) -> GatewayConfig {
    if Path::new(path).exists() {
        match fs::read_to_string(&path).await {
            Ok(txt) if txt.trim().is_empty() => GatewayConfig::default(),
            Ok(txt) => serde_yaml::from_str(&txt).unwrap_or_else(|e| {
                warn!("[gateway] config invalide: {e}");
                GatewayConfig::default()
            }),
            Err(e) => {
                warn!("[gateway] config illisible ({path}): {e}");
                GatewayConfig::default()
            }
        }
    } else {
        info!("[gateway] pas de {path}, usage config par défaut");
        GatewayConfig::default()
    }
}

pub fn apply_env<F>(cfg: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("NETPROBE_LISTEN_ADDR") {
        match addr.parse() {
            Ok(listen) => cfg.listen = listen,
            Err(e) => warn!("[gateway] NETPROBE_LISTEN_ADDR invalide ({addr}): {e}"),
        }
    }
    if let Some(host) = lookup("NETPROBE_MQTT_HOST") {
        let port = lookup("NETPROBE_MQTT_PORT").and_then(|p| p.parse().ok()).unwrap_or(1883);
        cfg.mqtt = Some(MqttConf { host, port });
    }
}
