//! NetProbe consumer - telemetry → alarm pipeline
//!
//! - Broker connection lifecycle with indefinite reconnect (`broker`)
//! - Ack / delayed nack discipline per delivery (`redelivery`)
//! - Alarm delivery over HTTP, gate-aware (`sink`)
//! - Transition-only health reporting (`health`)

pub mod broker;
pub mod config;
pub mod health;
pub mod redelivery;
pub mod shutdown;
pub mod sink;

pub use broker::{BrokerConnector, ConnectorState};
pub use config::ConsumerConfig;
pub use health::HealthReporter;
pub use redelivery::{RedeliveryController, RequeueReason, Verdict};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use sink::HttpAlarmSink;
