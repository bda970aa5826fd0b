//! data structures for deserializing incoming alerts
use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

/// label and annotation maps are kept sorted by key so everything derived
/// from them iterates in a reproducible order
pub type KeyValues = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
/// state transition reported for a single alert
pub enum AlertStatus {
	/// the alert condition is active
	Firing,
	/// the alert condition cleared
	Resolved,
}

impl AlertStatus {
	/// lowercase wire name, also used as metric label value
	pub fn as_str(&self) -> &'static str {
		match self {
			AlertStatus::Firing => "firing",
			AlertStatus::Resolved => "resolved",
		}
	}
}

impl fmt::Display for AlertStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
/// payload received by the alertmanager webhook receiver
pub struct AlertBatch {
	/// overall status of the notification. Informational only, every alert
	/// carries its own status
	#[serde(default)]
	#[serde_as(as = "DefaultOnNull")]
	pub status: String,
	/// name of the receiver the notification was routed to
	#[serde(default)]
	#[serde_as(as = "DefaultOnNull")]
	pub receiver: String,
	/// alertmanager group key, only logged
	#[serde(default)]
	#[serde_as(as = "DefaultOnNull")]
	pub group_key: String,
	/// base url of the monitoring ui, used to build deep links
	#[serde(rename = "externalURL", default, skip_serializing_if = "Option::is_none")]
	pub external_url: Option<String>,
	/// alerts in the order they were sent
	#[serde(default)]
	#[serde_as(as = "DefaultOnNull")]
	pub alerts: Vec<Alert>,
}

impl AlertBatch {
	/// external url, empty if none was sent
	pub fn external_url(&self) -> &str {
		self.external_url.as_deref().unwrap_or_default()
	}
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::missing_docs_in_private_items)]
pub struct Alert {
	pub status: AlertStatus,
	#[serde(default)]
	#[serde_as(as = "DefaultOnNull")]
	pub labels: KeyValues,
	#[serde(default)]
	#[serde_as(as = "DefaultOnNull")]
	pub annotations: KeyValues,
	#[serde(rename = "generatorURL", default, skip_serializing_if = "Option::is_none")]
	pub generator_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fingerprint: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub starts_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ends_at: Option<DateTime<Utc>>,
}

impl Alert {
	/// creates an alert without labels, annotations or links
	pub fn new(status: AlertStatus) -> Self {
		Self {
			status,
			labels: KeyValues::new(),
			annotations: KeyValues::new(),
			generator_url: None,
			fingerprint: None,
			starts_at: None,
			ends_at: None,
		}
	}

	/// value of a label, empty if the label is missing
	pub fn label(&self, key: &str) -> &str {
		self.labels.get(key).map(String::as_str).unwrap_or_default()
	}

	/// value of an annotation, empty if the annotation is missing
	pub fn annotation(&self, key: &str) -> &str {
		self.annotations.get(key).map(String::as_str).unwrap_or_default()
	}

	/// generator url, empty if none was sent
	pub fn generator_url(&self) -> &str {
		self.generator_url.as_deref().unwrap_or_default()
	}

	/// the point in time this alert's current state began
	pub fn transitioned_at(&self) -> Option<DateTime<Utc>> {
		match self.status {
			AlertStatus::Firing => self.starts_at,
			AlertStatus::Resolved => self.ends_at,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const GRAFANA_PAYLOAD: &str = r#"{
		"receiver": "discord",
		"status": "firing",
		"orgId": 1,
		"alerts": [
			{
				"status": "firing",
				"labels": {
					"alertname": "HighCPU",
					"severity": "critical",
					"namespace": "production"
				},
				"annotations": {
					"summary": "CPU is high",
					"description": "CPU usage above 90%"
				},
				"startsAt": "2024-05-01T12:00:00Z",
				"endsAt": "0001-01-01T00:00:00Z",
				"generatorURL": "https://grafana.example.com/alerting/grafana/abc/view",
				"fingerprint": "c6eadffa33fcdf37",
				"silenceURL": "https://grafana.example.com/alerting/silence/new",
				"values": { "A": 93.1 }
			},
			{
				"status": "resolved",
				"labels": null,
				"annotations": {}
			}
		],
		"groupLabels": {},
		"commonLabels": {},
		"commonAnnotations": {},
		"externalURL": "https://grafana.example.com/",
		"version": "1",
		"groupKey": "{}:{}",
		"truncatedAlerts": 0,
		"title": "[FIRING:1]",
		"state": "alerting",
		"message": "**Firing**"
	}"#;

	#[test]
	fn decodes_grafana_payload() {
		let batch: AlertBatch = serde_json::from_str(GRAFANA_PAYLOAD).unwrap();

		assert_eq!(batch.status, "firing");
		assert_eq!(batch.receiver, "discord");
		assert_eq!(batch.external_url(), "https://grafana.example.com/");
		assert_eq!(batch.alerts.len(), 2);

		let first = &batch.alerts[0];
		assert_eq!(first.status, AlertStatus::Firing);
		assert_eq!(first.label("alertname"), "HighCPU");
		assert_eq!(first.annotation("summary"), "CPU is high");
		assert_eq!(first.fingerprint.as_deref(), Some("c6eadffa33fcdf37"));
		assert_eq!(
			first.transitioned_at().map(|t| t.to_rfc3339()),
			Some("2024-05-01T12:00:00+00:00".to_owned())
		);

		let second = &batch.alerts[1];
		assert_eq!(second.status, AlertStatus::Resolved);
		assert!(second.labels.is_empty());
		assert_eq!(second.label("alertname"), "");
		assert_eq!(second.generator_url(), "");
		assert_eq!(second.transitioned_at(), None);
	}

	#[test]
	fn missing_fields_default_to_empty() {
		let batch: AlertBatch = serde_json::from_str(r#"{"alerts":[{"status":"firing"}]}"#).unwrap();

		assert_eq!(batch.status, "");
		assert_eq!(batch.external_url(), "");
		assert_eq!(batch.alerts[0].label("severity"), "");
		assert_eq!(batch.alerts[0].annotation("description"), "");

		let empty: AlertBatch = serde_json::from_str("{}").unwrap();
		assert!(empty.alerts.is_empty());
	}

	#[test]
	fn rejects_unknown_alert_status() {
		let result = serde_json::from_str::<AlertBatch>(r#"{"alerts":[{"status":"pending"}]}"#);
		assert!(result.is_err());

		let result = serde_json::from_str::<AlertBatch>(r#"{"alerts":[{"labels":{}}]}"#);
		assert!(result.is_err());
	}

	#[test]
	fn labels_iterate_sorted() {
		let batch: AlertBatch = serde_json::from_str(
			r#"{"alerts":[{"status":"firing","labels":{"zone":"a","alertname":"X","instance":"i"}}]}"#,
		)
		.unwrap();

		let keys: Vec<_> = batch.alerts[0].labels.keys().map(String::as_str).collect();
		assert_eq!(keys, ["alertname", "instance", "zone"]);
	}
}
