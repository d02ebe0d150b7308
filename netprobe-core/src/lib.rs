/*!
# NetProbe Core - Modèle et règles du pipeline télémétrie → alarmes

Partagé par le consommateur AMQP et la gateway HTTP :
- Modèle de données (échantillons de télémétrie, alarmes, statuts de service)
- Évaluateur de seuils (fonction pure, deux politiques nommées)
- Gate d'admission (ouvert/fermé, piloté par `service-control`)
- Tableau des statuts avec filtrage des transitions
- Points d'extension : `AlarmSink`, `DeliveryAcker`, `Notifier`
*/

pub mod delivery;
pub mod gate;
pub mod models;
pub mod notify;
pub mod sink;
pub mod state;
pub mod status;
pub mod thresholds;

pub use delivery::{AckError, DeliveryAcker};
pub use gate::{AdmissionGate, GateAction, GateError, GateState};
pub use models::{AlarmEvent, DecodeError, ServiceState, ServiceStatus, Severity, StoredAlarm, TelemetrySample};
pub use notify::{ChangeEvent, LogNotifier, MqttNotifier, Notifier, NotifyError};
pub use sink::{AlarmSink, SubmitOutcome};
pub use status::StatusBoard;
pub use thresholds::{EvaluationPolicy, Evaluator};

/// Horodatage RFC 3339 (UTC) utilisé partout dans le pipeline.
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
