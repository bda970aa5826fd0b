//! Here we expose prometheus metrics and liveness probes
use axum::{
	extract::Extension,
	http::{header::CONTENT_TYPE, StatusCode},
	response::{IntoResponse, Response},
	routing::get,
	Router,
};

use crate::metrics::PrometheusMetrics;

async fn metrics_handler(Extension(metrics): Extension<PrometheusMetrics>) -> Response {
	match metrics.encode() {
		Ok((content_type, buffer)) => ([(CONTENT_TYPE, content_type)], buffer).into_response(),
		Err(err) => {
			tracing::error!("failed to encode metrics: {err}");
			StatusCode::INTERNAL_SERVER_ERROR.into_response()
		}
	}
}

/// the process is up
async fn health() -> StatusCode {
	StatusCode::OK
}

/// the process accepts webhooks. There is nothing to warm up, so this is the
/// same as [health]
async fn ready() -> StatusCode {
	StatusCode::OK
}

pub fn router(metrics: PrometheusMetrics) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/ready", get(ready))
		.route("/metrics", get(metrics_handler))
		.layer(Extension(metrics))
}
