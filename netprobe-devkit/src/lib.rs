/*!
# NetProbe DevKit - Doublures de test pour le pipeline

Permet de tester le consommateur sans broker AMQP ni store réels :
- `FakeAcker` : enregistre les ack / nack(requeue) avec leur instant tokio
- `ScriptedSink` : issue de soumission programmable par signal_id
- `RecordingNotifier` : capture les événements du fan-out
- `TelemetryBuilder` : fixtures de télémétrie au format du producteur
*/

pub mod broker_stub;
pub mod fixtures;
pub mod sink_stub;

pub use broker_stub::{AckCall, FakeAcker};
pub use fixtures::TelemetryBuilder;
pub use sink_stub::{RecordingNotifier, ScriptedSink};
