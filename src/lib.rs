//! grafana alertmanager receiver that forwards alerts into discord webhooks
//!
//! Features:
//! - one discord message per alert with severity dependent title and color
//! - deep links to the alert source, the alert list and a prefilled silence
//! - prometheus metrics, health and readiness probes

pub mod alert;
pub mod alertmanager_webhook_receiver;
pub mod delivery;
pub mod log;
pub mod message;
pub mod metrics;
pub mod settings;
pub mod telemetry_endpoint;
pub mod transformer;
