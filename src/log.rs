use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_subscriber::{
	filter::LevelFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
	EnvFilter,
};

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	/// human readable, for local runs
	Pretty,
	/// one json object per line
	Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
	pub level: String,
	pub format: LogFormat,
}

impl LogSettings {
	pub fn global() -> &'static Self {
		&Settings::global().log
	}

	fn filter(&self) -> Result<EnvFilter> {
		let level = tracing::Level::from_str(self.level.as_str())
			.with_context(|| format!("invalid log level {:?}", self.level))?;

		Ok(EnvFilter::default()
			.add_directive(LevelFilter::from_level(level).into())
			.add_directive("hyper=warn".parse()?)
			.add_directive("reqwest=warn".parse()?))
	}
}

pub fn setup_logging() -> Result<()> {
	let settings = LogSettings::global();
	let filter_layer = settings.filter()?;

	let registry = tracing_subscriber::registry().with(filter_layer);
	let installed = match settings.format {
		LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
		LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
	};

	installed.context("a global tracing subscriber is already installed")?;

	Ok(())
}
