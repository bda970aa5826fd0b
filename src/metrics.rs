//! prometheus meters for the webhook receiver
//!
//! The request handler only talks to [WebhookObserver], so it can be tested
//! without a metrics registry.

use std::time::Duration;

use prometheus::{
	histogram_opts, opts, Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, Registry,
	TextEncoder,
};

/// how a webhook request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookOutcome {
	Success,
	/// the request body wasn't a valid alert batch
	DecodeError,
	/// a message couldn't be delivered to discord
	DiscordError,
	/// the handler panicked
	Panic,
}

impl WebhookOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			WebhookOutcome::Success => "success",
			WebhookOutcome::DecodeError => "decode_error",
			WebhookOutcome::DiscordError => "discord_error",
			WebhookOutcome::Panic => "panic",
		}
	}
}

/// receives events of the webhook request handler
pub trait WebhookObserver: Send + Sync {
	/// an alert was decoded from an incoming batch
	fn record_alert(&self, status: &str, severity: &str);

	/// a message delivery attempt finished
	fn record_delivery(&self, success: bool, duration: Duration);

	fn record_outcome(&self, outcome: WebhookOutcome);

	/// all messages of a batch were delivered
	fn record_alerts_processed(&self);

	/// a request was answered, `duration` is missing when it couldn't be
	/// measured
	fn record_http_request(&self, path: &str, method: &str, status: u16, duration: Option<Duration>);
}

#[derive(Clone)]
/// [WebhookObserver] backed by its own prometheus [Registry]
pub struct PrometheusMetrics {
	registry: Registry,
	http_requests: IntCounterVec,
	http_request_duration: HistogramVec,
	webhook_requests: IntCounterVec,
	discord_sends: IntCounterVec,
	discord_send_duration: Histogram,
	alerts_received: IntCounterVec,
	alerts_processed: IntCounter,
}

impl PrometheusMetrics {
	/// construct and register prometheus meters
	pub fn new() -> Result<Self, prometheus::Error> {
		let registry = Registry::new();

		let http_requests = IntCounterVec::new(
			opts!("http_requests_total", "Total number of HTTP requests"),
			&["path", "method", "status"],
		)?;

		let http_request_duration = HistogramVec::new(
			histogram_opts!("http_request_duration_seconds", "HTTP request latencies in seconds"),
			&["path", "method"],
		)?;

		let webhook_requests = IntCounterVec::new(
			opts!("webhook_requests_total", "Total number of webhook requests received"),
			&["status"],
		)?;

		let discord_sends = IntCounterVec::new(
			opts!("webhook_discord_send_total", "Total number of Discord webhook sends"),
			&["status"],
		)?;

		let discord_send_duration = Histogram::with_opts(histogram_opts!(
			"webhook_discord_send_duration_seconds",
			"Duration of Discord webhook sends in seconds"
		))?;

		let alerts_received = IntCounterVec::new(
			opts!("alerts_received_total", "Total number of alerts received from Grafana"),
			&["status", "severity"],
		)?;

		let alerts_processed =
			IntCounter::with_opts(opts!("alerts_processed_total", "Total number of alerts successfully processed"))?;

		registry.register(Box::new(http_requests.clone()))?;
		registry.register(Box::new(http_request_duration.clone()))?;
		registry.register(Box::new(webhook_requests.clone()))?;
		registry.register(Box::new(discord_sends.clone()))?;
		registry.register(Box::new(discord_send_duration.clone()))?;
		registry.register(Box::new(alerts_received.clone()))?;
		registry.register(Box::new(alerts_processed.clone()))?;

		Ok(Self {
			registry,
			http_requests,
			http_request_duration,
			webhook_requests,
			discord_sends,
			discord_send_duration,
			alerts_received,
			alerts_processed,
		})
	}

	/// metrics in the prometheus text exposition format
	pub fn encode(&self) -> Result<(String, Vec<u8>), prometheus::Error> {
		let encoder = TextEncoder::new();
		let mut buffer = Vec::new();

		encoder.encode(&self.registry.gather(), &mut buffer)?;

		Ok((encoder.format_type().to_owned(), buffer))
	}
}

impl WebhookObserver for PrometheusMetrics {
	fn record_alert(&self, status: &str, severity: &str) {
		self.alerts_received.with_label_values(&[status, severity]).inc();
	}

	fn record_delivery(&self, success: bool, duration: Duration) {
		let status = if success { "success" } else { "failure" };

		self.discord_sends.with_label_values(&[status]).inc();
		self.discord_send_duration.observe(duration.as_secs_f64());
	}

	fn record_outcome(&self, outcome: WebhookOutcome) {
		self.webhook_requests.with_label_values(&[outcome.as_str()]).inc();
	}

	fn record_alerts_processed(&self) {
		self.alerts_processed.inc();
	}

	fn record_http_request(&self, path: &str, method: &str, status: u16, duration: Option<Duration>) {
		let status = status.to_string();

		self.http_requests.with_label_values(&[path, method, status.as_str()]).inc();
		if let Some(duration) = duration {
			self.http_request_duration.with_label_values(&[path, method]).observe(duration.as_secs_f64());
		}
	}
}
