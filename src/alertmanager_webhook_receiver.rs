//! Receives alert batches from grafana and forwards them into discord.
//!
//! A batch is rendered by the [Transformer] and every resulting message is
//! delivered in order. Delivery stops at the first failure, which means
//! messages before the failing one have already been posted when the request
//! is answered with an error. Grafana retrying such a request posts them
//! again, so delivery is at-least-once.

use std::{
	any::Any,
	net::{IpAddr, SocketAddr},
	sync::Arc,
	time::Instant,
};

use anyhow::{Context, Result};
use axum::{
	body::Bytes,
	extract::Extension,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::post,
	Router,
};
use serde::Deserialize;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;

use crate::{
	alert::AlertBatch,
	delivery::{Deliver, DeliveryError},
	metrics::{WebhookObserver, WebhookOutcome},
	settings::Settings,
	transformer::Transformer,
};

/// path grafana posts its notifications to
pub const WEBHOOK_PATH: &str = "/webhook";

#[derive(Debug, Deserialize, Clone)]
pub struct AlertReceiverSettings {
	pub bind_address: IpAddr,
	pub port: u16,
}

impl AlertReceiverSettings {
	pub fn global() -> &'static Self {
		&Settings::global().receiver
	}

	pub fn to_socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.bind_address, self.port)
	}
}

/// Error answering a webhook request
#[derive(Error, Debug)]
pub enum WebhookError {
	/// the body is not a well formed alert batch
	#[error("invalid request body: {0}")]
	Decode(#[from] serde_json::Error),
	/// forwarding message number `index` (zero based) of `total` failed,
	/// all messages before it were delivered
	#[error("failed to forward message {} of {total} to discord: {source}", .index + 1)]
	Delivery {
		index: usize,
		total: usize,
		#[source]
		source: DeliveryError,
	},
}

impl WebhookError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			WebhookError::Decode(_) => StatusCode::BAD_REQUEST,
			WebhookError::Delivery { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn outcome(&self) -> WebhookOutcome {
		match self {
			WebhookError::Decode(_) => WebhookOutcome::DecodeError,
			WebhookError::Delivery { .. } => WebhookOutcome::DiscordError,
		}
	}

	/// message returned to the caller, details only go into the log
	fn public_message(&self) -> &'static str {
		match self {
			WebhookError::Decode(_) => "Invalid request body",
			WebhookError::Delivery { .. } => "Failed to forward to Discord",
		}
	}
}

impl IntoResponse for WebhookError {
	fn into_response(self) -> Response {
		(self.status_code(), self.public_message()).into_response()
	}
}

/// what a successfully handled request forwarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forwarded {
	pub alerts: usize,
	pub messages: usize,
	/// status of the whole batch as reported by grafana
	pub status: String,
}

/// collaborators of the webhook handler
pub struct ReceiverState {
	transformer: Transformer,
	delivery: Arc<dyn Deliver>,
	observer: Arc<dyn WebhookObserver>,
}

impl ReceiverState {
	pub fn new(transformer: Transformer, delivery: Arc<dyn Deliver>, observer: Arc<dyn WebhookObserver>) -> Self {
		Self { transformer, delivery, observer }
	}

	/// Decodes `body`, renders the batch and delivers every message in order.
	///
	/// # Arguments
	///
	/// * `body` - raw request body as sent by grafana
	pub async fn forward_alerts(&self, body: &[u8]) -> Result<Forwarded, WebhookError> {
		tracing::debug!(body = %String::from_utf8_lossy(body), "received webhook request");

		let batch: AlertBatch = serde_json::from_slice(body)?;

		tracing::debug!(
			receiver = %batch.receiver,
			group_key = %batch.group_key,
			alerts = batch.alerts.len(),
			"decoded alert batch"
		);

		for alert in &batch.alerts {
			let severity = match alert.label("severity") {
				"" => "none",
				severity => severity,
			};
			tracing::debug!(
				alertname = alert.label("alertname"),
				fingerprint = alert.fingerprint.as_deref().unwrap_or_default(),
				status = %alert.status,
				severity,
				"received alert"
			);
			self.observer.record_alert(alert.status.as_str(), severity);
		}

		let messages = self.transformer.transform(&batch);
		let total = messages.len();

		for (index, message) in messages.iter().enumerate() {
			let start = Instant::now();
			let result = self.delivery.send(message).await;
			self.observer.record_delivery(result.is_ok(), start.elapsed());

			result.map_err(|source| WebhookError::Delivery { index, total, source })?;
		}

		Ok(Forwarded { alerts: batch.alerts.len(), messages: total, status: batch.status })
	}
}

async fn receive_alerts(Extension(state): Extension<Arc<ReceiverState>>, body: Bytes) -> Response {
	let start = Instant::now();

	let (outcome, response) = match state.forward_alerts(&body).await {
		Ok(forwarded) => {
			state.observer.record_alerts_processed();
			tracing::info!(
				count = forwarded.alerts,
				messages = forwarded.messages,
				status = %forwarded.status,
				duration_ms = start.elapsed().as_millis() as u64,
				"Successfully forwarded alerts"
			);
			(WebhookOutcome::Success, (StatusCode::OK, "OK").into_response())
		}
		Err(err) => {
			match &err {
				WebhookError::Decode(_) => tracing::warn!("{err}"),
				WebhookError::Delivery { source: DeliveryError::UnexpectedStatus { body, .. }, .. } => {
					tracing::error!(response = %body, "{err}")
				}
				WebhookError::Delivery { .. } => tracing::error!("{err}"),
			}
			(err.outcome(), err.into_response())
		}
	};

	state.observer.record_outcome(outcome);
	state
		.observer
		.record_http_request(WEBHOOK_PATH, "POST", response.status().as_u16(), Some(start.elapsed()));

	response
}

/// turns a panic inside the handler into a plain `500`
fn panic_response(observer: &Arc<dyn WebhookObserver>, panic: Box<dyn Any + Send + 'static>) -> Response {
	let detail = panic
		.downcast_ref::<String>()
		.map(String::as_str)
		.or_else(|| panic.downcast_ref::<&str>().copied())
		.unwrap_or("unknown panic payload");

	tracing::error!(path = WEBHOOK_PATH, "panic while handling request: {detail}");
	observer.record_outcome(WebhookOutcome::Panic);
	// the start of a panicked request is unknown, count it without a latency
	observer.record_http_request(WEBHOOK_PATH, "POST", 500, None);

	(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

/// routes of the webhook receiver, guarded by a panic boundary
pub fn router(state: Arc<ReceiverState>) -> Router {
	let observer = Arc::clone(&state.observer);

	Router::new()
		.route(WEBHOOK_PATH, post(receive_alerts))
		.layer(Extension(state))
		.layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
			panic_response(&observer, panic)
		}))
}

/// serves `app` until ctrl-c is received
pub async fn run_alert_receiver(app: Router) -> Result<()> {
	let addr = AlertReceiverSettings::global().to_socket_addr();

	tracing::info!(%addr, "Server starting");

	axum::Server::try_bind(&addr)
		.with_context(|| format!("failed to bind {addr}"))?
		.serve(app.into_make_service())
		.with_graceful_shutdown(async {
			let _ = tokio::signal::ctrl_c().await;
		})
		.await
		.context("alert receiver crashed")?;

	Ok(())
}
