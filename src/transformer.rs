//! Renders alertmanager notifications into discord webhook messages.
//!
//! Every alert of a batch becomes its own message with a single embed, so each
//! alert gets its own title, color and deep links. The transformation never
//! fails: missing labels, annotations and urls only drop the parts of the
//! message they would have produced.

use std::fmt::Write;

use serde::Deserialize;

use crate::{
	alert::{Alert, AlertBatch, AlertStatus, KeyValues},
	message::{Embed, EmbedField, EmbedFooter, OutboundMessage, EMBED_TYPE_RICH},
};

/// embed color of firing critical alerts (grafana red)
pub const COLOR_CRITICAL: u32 = 14037554;
/// embed color of all other firing alerts
pub const COLOR_WARNING: u32 = 16776960;
/// embed color of resolved alerts
pub const COLOR_RESOLVED: u32 = 3066993;

/// maximum number of characters discord accepts in a field value
pub const MAX_FIELD_VALUE_LEN: usize = 1024;
/// maximum number of characters discord accepts in a footer
pub const MAX_FOOTER_TEXT_LEN: usize = 2048;

const ELLIPSIS: char = '…';

/// static parts of every message which identify the source of the alerts
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Branding {
	/// display name the messages are posted with
	pub username: Option<String>,
	pub footer_text: String,
	pub footer_icon_url: Option<String>,
}

impl Default for Branding {
	fn default() -> Self {
		Self {
			username: Some("Grafana".to_owned()),
			footer_text: "Grafana v12.3.2".to_owned(),
			footer_icon_url: Some("https://grafana.com/static/assets/img/fav32.png".to_owned()),
		}
	}
}

/// how an alert's `severity` label affects rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityClass {
	Critical,
	/// `notification` and `info` alerts, rendered without a status line
	Notification,
	Other,
}

impl SeverityClass {
	pub fn of(alert: &Alert) -> Self {
		match alert.label("severity") {
			"critical" => SeverityClass::Critical,
			"notification" | "info" => SeverityClass::Notification,
			_ => SeverityClass::Other,
		}
	}
}

#[derive(Debug, Clone, Default)]
/// Alert transformer
pub struct Transformer {
	branding: Branding,
}

impl Transformer {
	pub fn new(branding: Branding) -> Self {
		Self { branding }
	}

	/// Renders one message per alert, in the order the alerts were received.
	/// An empty batch yields no messages.
	pub fn transform(&self, batch: &AlertBatch) -> Vec<OutboundMessage> {
		let external_url = batch.external_url();

		batch
			.alerts
			.iter()
			.map(|alert| OutboundMessage {
				username: self.branding.username.clone(),
				content: None,
				embeds: vec![self.render_embed(alert, external_url)],
			})
			.collect()
	}

	/// renders the single embed describing `alert`
	fn render_embed(&self, alert: &Alert, external_url: &str) -> Embed {
		let severity = SeverityClass::of(alert);

		Embed {
			title: title(alert.status, severity).to_owned(),
			description: None,
			kind: Some(EMBED_TYPE_RICH.to_owned()),
			url: alerting_list_url(external_url),
			color: color(alert.status, severity),
			fields: vec![EmbedField {
				name: alert.label("alertname").to_owned(),
				value: field_value(alert, severity, external_url),
				inline: false,
			}],
			footer: Some(EmbedFooter {
				text: truncate(&self.branding.footer_text, MAX_FOOTER_TEXT_LEN),
				icon_url: self.branding.footer_icon_url.clone(),
			}),
			timestamp: alert.transitioned_at(),
		}
	}
}

/// [Transformer::transform] with the default [Branding]
pub fn transform(batch: &AlertBatch) -> Vec<OutboundMessage> {
	Transformer::default().transform(batch)
}

pub fn title(status: AlertStatus, severity: SeverityClass) -> &'static str {
	match (status, severity) {
		(_, SeverityClass::Notification) => "ℹ️ Notification",
		(AlertStatus::Firing, SeverityClass::Critical) => "🔥 Critical Alert Firing",
		(AlertStatus::Firing, SeverityClass::Other) => "⚠️ Warning Alert Firing",
		(AlertStatus::Resolved, _) => "✅ Alert Resolved",
	}
}

/// notification alerts share the color of their status
pub fn color(status: AlertStatus, severity: SeverityClass) -> u32 {
	match (status, severity) {
		(AlertStatus::Firing, SeverityClass::Critical) => COLOR_CRITICAL,
		(AlertStatus::Firing, _) => COLOR_WARNING,
		(AlertStatus::Resolved, _) => COLOR_RESOLVED,
	}
}

fn base_url(external_url: &str) -> &str {
	external_url.strip_suffix('/').unwrap_or(external_url)
}

/// link to the alert rule list of the monitoring ui
pub fn alerting_list_url(external_url: &str) -> Option<String> {
	if external_url.is_empty() {
		return None;
	}

	Some(format!("{}/alerting/list", base_url(external_url)))
}

/// Builds a link that opens the silence editor prefilled with one matcher per
/// label. Labels are visited in key order.
pub fn silence_url(external_url: &str, labels: &KeyValues) -> String {
	let mut url = format!("{}/alerting/silence/new?alertmanager=grafana", base_url(external_url));

	for (key, value) in labels {
		let _ = write!(url, "&matcher={}%3D{}", key, value.replace(' ', "+"));
	}

	if external_url.contains("orgId=") {
		url.push_str("&orgId=1");
	}

	url
}

/// Text of the single embed field.
///
/// When the value exceeds [MAX_FIELD_VALUE_LEN] only the annotation text is
/// cut, so the namespace, status and links lines stay intact.
fn field_value(alert: &Alert, severity: SeverityClass, external_url: &str) -> String {
	let mut details = String::new();

	let annotations = [
		("Summary", alert.annotation("summary")),
		("Description", alert.annotation("description")),
		("Query Results", alert.annotation("values")),
	];
	for (name, text) in annotations {
		if !text.is_empty() {
			let _ = writeln!(details, "**{name}:** {text}");
		}
	}

	let trailer = field_trailer(alert, severity, external_url);

	let room = MAX_FIELD_VALUE_LEN.saturating_sub(trailer.chars().count());
	if details.chars().count() > room {
		// keep the cut details on their own line
		details = truncate(details.trim_end_matches('\n'), room.saturating_sub(1));
		details.push('\n');
	}
	details.push_str(&trailer);

	// no-op unless the trailer alone is too long
	truncate(&details, MAX_FIELD_VALUE_LEN)
}

/// namespace, status and links lines of the field value
fn field_trailer(alert: &Alert, severity: SeverityClass, external_url: &str) -> String {
	let mut value = String::new();

	let namespace = alert.label("namespace");
	if !namespace.is_empty() {
		let _ = writeln!(value, "**Namespace:** {namespace}");
	}

	if severity != SeverityClass::Notification {
		let line = match alert.status {
			AlertStatus::Firing => "🔴 Firing",
			AlertStatus::Resolved => "✅ Resolved",
		};
		let _ = writeln!(value, "**Status:** {line}");
	}

	let mut links = Vec::with_capacity(2);
	if !alert.generator_url().is_empty() {
		links.push(format!("[View Source]({})", alert.generator_url()));
	}
	if !external_url.is_empty() {
		links.push(format!("[Silence]({})", silence_url(external_url, &alert.labels)));
	}

	if !links.is_empty() {
		value.push('\n');
		value.push_str(&links.join(" • "));
	}

	value
}

/// cuts `text` down to `max` characters, marking the cut with an ellipsis
fn truncate(text: &str, max: usize) -> String {
	match text.char_indices().nth(max) {
		None => text.to_owned(),
		Some(_) => {
			let (cut, _) = text.char_indices().nth(max.saturating_sub(1)).unwrap_or((0, ' '));
			let mut truncated = text[..cut].to_owned();
			truncated.push(ELLIPSIS);
			truncated
		}
	}
}
