/**
 * API REST NETPROBE - Frontière HTTP du pipeline
 *
 * RÔLE :
 * Point d'entrée des alarmes produites par le consommateur, collecteur des
 * statuts de service et surface de contrôle du gate d'admission.
 *
 * ROUTES :
 * - GET  /health                  : liveness
 * - POST /api/alarms              : 201 créée, 400 sans identifiant, 503 gate fermé, 500 store en échec
 * - GET  /api/alarms              : alarmes enregistrées
 * - POST /api/app-status          : statut d'un service (propagé seulement sur transition)
 * - GET  /api/app-status          : tous les statuts suivis
 * - POST /api/service-control     : {service, action: stop|start}
 * - GET  /api/service-control     : état courant du gate
 *
 * Le gate est lu une seule fois par soumission : une alarme est soit refusée
 * entière (503), soit enregistrée.
 */

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use netprobe_core::{AdmissionGate, ChangeEvent, GateState, Notifier, ServiceState, ServiceStatus, StatusBoard, StoredAlarm};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::alarms::{AlarmIngest, AlarmStore};

#[derive(Clone)]
pub struct AppState {
    pub gate: AdmissionGate,
    pub board: StatusBoard,
    pub store: Arc<dyn AlarmStore>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Deserialize)]
struct StatusReport {
    service: String,
    status: String,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ControlRequest {
    service: String,
    action: String,
}

#[derive(Debug, Serialize)]
struct ControlView {
    service: String,
    state: GateState,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(code: StatusCode, msg: &str) -> ApiError {
    (code, Json(json!({ "error": msg })))
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/alarms", get(list_alarms).post(create_alarm))
        .route("/api/app-status", get(list_status).post(report_status))
        .route("/api/service-control", get(get_control).post(service_control))
        .with_state(app_state)
}

/// Sert le routeur sur un listener déjà lié (port 0 accepté pour les tests)
pub async fn serve(listener: TcpListener, app_state: AppState) -> std::io::Result<()> {
    axum::serve(listener, build_router(app_state)).await
}

// POST /api/alarms
async fn create_alarm(
    State(app): State<AppState>,
    Json(body): Json<AlarmIngest>,
) -> Result<(StatusCode, Json<StoredAlarm>), ApiError> {
    if !app.gate.is_open() {
        return Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "service paused"));
    }
    let alarm = body
        .into_alarm()
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "signal_id or metric is required"))?;

    let stored = app.store.create(alarm).map_err(|e| {
        error!("[gateway] alarm creation failed: {e}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "alarm creation failed")
    })?;
    info!(id = stored.id, signal_id = %stored.alarm.signal_id, "alarm created");

    if let Err(e) = app.notifier.notify(&ChangeEvent::AlarmCreated(stored.clone())).await {
        warn!("[gateway] alarm fan-out failed: {e}");
    }
    Ok((StatusCode::CREATED, Json(stored)))
}

// GET /api/alarms
async fn list_alarms(State(app): State<AppState>) -> Result<Json<Vec<StoredAlarm>>, ApiError> {
    app.store.list().map(Json).map_err(|e| {
        error!("[gateway] alarm listing failed: {e}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "alarm listing failed")
    })
}

// POST /api/app-status
async fn report_status(
    State(app): State<AppState>,
    Json(report): Json<StatusReport>,
) -> Result<Json<ServiceStatus>, ApiError> {
    let status: ServiceState = report
        .status
        .parse()
        .map_err(|e: String| api_error(StatusCode::BAD_REQUEST, &e))?;

    if let Some(changed) = app.board.record(&report.service, status, report.message) {
        info!(service = %changed.name, %status, "service status changed");
        if let Err(e) = app.notifier.notify(&ChangeEvent::StatusChanged(changed)).await {
            warn!("[gateway] status fan-out failed: {e}");
        }
    }
    // inchangé ou non, on renvoie l'enregistrement courant
    app.board
        .get(&report.service)
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::INTERNAL_SERVER_ERROR, "status not recorded"))
}

// GET /api/app-status
async fn list_status(State(app): State<AppState>) -> Json<Vec<ServiceStatus>> {
    Json(app.board.all())
}

// POST /api/service-control
async fn service_control(
    State(app): State<AppState>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<ControlView>, ApiError> {
    match app.gate.control(&req.service, &req.action) {
        Ok(state) => Ok(Json(ControlView { service: req.service, state })),
        Err(e) => {
            warn!("[gateway] service-control rejected: {e}");
            Err(api_error(StatusCode::BAD_REQUEST, &e.to_string()))
        }
    }
}

// GET /api/service-control
async fn get_control(State(app): State<AppState>) -> Json<ControlView> {
    Json(ControlView { service: app.gate.service().to_string(), state: app.gate.state() })
}
