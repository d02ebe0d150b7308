/*!
# NetProbe Gateway - API REST du pipeline télémétrie → alarmes

- Ingestion des alarmes soumise au gate d'admission (503 si fermé)
- Collecte des statuts de service (`/api/app-status`)
- Contrôle du gate (`/api/service-control`)
*/

pub mod alarms;
pub mod config;
pub mod http;

pub use alarms::{AlarmStore, InMemoryAlarmStore, StoreError};
pub use config::GatewayConfig;
pub use http::{build_router, serve, AppState};
