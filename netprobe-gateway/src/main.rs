/**
 * NETPROBE GATEWAY - Point d'entrée du serveur HTTP
 *
 * RÔLE : Bootstrap : config, gate d'admission, tableau des statuts, store
 * d'alarmes, fan-out MQTT optionnel, puis service Axum.
 */

use anyhow::{Context, Result};
use netprobe_core::{AdmissionGate, LogNotifier, MqttNotifier, Notifier, StatusBoard};
use netprobe_gateway::{config::load_config, serve, AppState, InMemoryAlarmStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("netprobe_gateway=info,netprobe_core=info")),
        )
        .init();

    let cfg = load_config().await;

    let notifier: Arc<dyn Notifier> = match &cfg.mqtt {
        Some(mqtt) => Arc::new(MqttNotifier::connect("netprobe-gateway", &mqtt.host, mqtt.port)),
        None => Arc::new(LogNotifier),
    };

    // état unique pour Axum
    let app_state = AppState {
        gate: AdmissionGate::new(&cfg.controlled_service),
        board: StatusBoard::seeded(cfg.services.iter().cloned()),
        store: Arc::new(InMemoryAlarmStore::new(cfg.max_alarms)),
        notifier,
    };

    let listener = TcpListener::bind(cfg.listen)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen))?;
    info!("[gateway] listening on http://{}", cfg.listen);

    serve(listener, app_state).await.context("HTTP server failed")?;
    Ok(())
}
