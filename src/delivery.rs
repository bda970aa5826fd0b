//! Forwards rendered messages to a discord webhook.
//!
//! Every message is a single POST request. Nothing is retried here, the
//! caller decides what a failed delivery means for the rest of its batch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use thiserror::Error;
use url::Url;

use crate::message::OutboundMessage;

/// how much of an error response body is kept for logging
const MAX_ERROR_BODY_LEN: usize = 512;

/// Error occuring when a message couldn't be delivered
#[derive(Error, Debug)]
pub enum DeliveryError {
	#[error("failed to encode message: {0}")]
	Encode(#[from] serde_json::Error),
	/// the request never got a response (connection, tls, timeout)
	#[error("failed to send webhook: {0}")]
	Transport(#[from] reqwest::Error),
	/// the webhook answered with something other than `204 No Content`
	#[error("unexpected status code: {}", .status.as_u16())]
	UnexpectedStatus { status: StatusCode, body: String },
}

/// Sends a rendered message somewhere
#[async_trait]
pub trait Deliver: Send + Sync {
	async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone)]
/// client for a single discord webhook url
pub struct DiscordWebhook {
	client: reqwest::Client,
	url: Url,
}

impl DiscordWebhook {
	/// Constructs a webhook client
	///
	/// # Arguments
	///
	/// * `url` - the webhook url including id and token
	///
	/// * `timeout` - upper bound for a single delivery including connecting
	pub fn new(url: Url, timeout: Duration) -> Result<Self, DeliveryError> {
		let client = reqwest::Client::builder()
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.timeout(timeout)
			.build()?;

		Ok(Self { client, url })
	}

	pub fn url(&self) -> &Url {
		&self.url
	}
}

#[async_trait]
impl Deliver for DiscordWebhook {
	async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
		let payload = serde_json::to_vec(message)?;

		let response = self
			.client
			.post(self.url.clone())
			.header(CONTENT_TYPE, "application/json")
			.body(payload)
			.send()
			.await?;

		let status = response.status();
		if status == StatusCode::NO_CONTENT {
			return Ok(());
		}

		// the body usually explains which part of the message discord rejected
		let mut body = response.text().await.unwrap_or_default();
		if let Some((cut, _)) = body.char_indices().nth(MAX_ERROR_BODY_LEN) {
			body.truncate(cut);
		}

		Err(DeliveryError::UnexpectedStatus { status, body })
	}
}
