use std::sync::Arc;

use alertcord::{
	alertmanager_webhook_receiver::{self, ReceiverState},
	delivery::DiscordWebhook,
	log,
	metrics::PrometheusMetrics,
	settings::Settings,
	telemetry_endpoint,
	transformer::Transformer,
};
use anyhow::{Context, Result};
use tower_http::trace::TraceLayer;

/// the entry point of the program
#[tokio::main]
pub async fn main() -> Result<()> {
	let settings = Settings::global();

	log::setup_logging().context("could not setup logging")?;

	let metrics = PrometheusMetrics::new().context("failed to register metrics")?;

	let discord = &settings.discord;
	let webhook = DiscordWebhook::new(discord.webhook_url.clone(), discord.timeout)
		.context("failed to construct discord webhook client")?;

	// the url path carries the webhook token, only log the host
	tracing::info!(host = webhook.url().host_str().unwrap_or_default(), "forwarding alerts to discord");

	let state = ReceiverState::new(
		Transformer::new(settings.branding.clone()),
		Arc::new(webhook),
		Arc::new(metrics.clone()),
	);

	let app = alertmanager_webhook_receiver::router(Arc::new(state))
		.merge(telemetry_endpoint::router(metrics))
		.layer(TraceLayer::new_for_http());

	alertmanager_webhook_receiver::run_alert_receiver(app).await
}
