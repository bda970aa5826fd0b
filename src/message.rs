//! Messages accepted by discord compatible webhooks.
//!
//! Empty optional values are left out when serializing, so a decoded message
//! serializes back to the same document.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// the only embed type webhooks may send
pub const EMBED_TYPE_RICH: &str = "rich";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
/// payload of a single webhook execution
pub struct OutboundMessage {
	/// overrides the webhook's default display name
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	/// plain text content shown above the embeds
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub embeds: Vec<Embed>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
/// rich content block of a message
pub struct Embed {
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub title: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	/// link opened when clicking the title
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	/// 24 bit rgb value
	#[serde(default, skip_serializing_if = "is_zero")]
	pub color: u32,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub fields: Vec<EmbedField>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub footer: Option<EmbedFooter>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EmbedField {
	pub name: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "is_false")]
	pub inline: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EmbedFooter {
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub icon_url: Option<String>,
}

fn is_zero(value: &u32) -> bool {
	*value == 0
}

fn is_false(value: &bool) -> bool {
	!*value
}
