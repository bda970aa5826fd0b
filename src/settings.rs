use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use config::{builder::DefaultState, Config, ConfigBuilder, Source};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_with::{serde_as, DurationSecondsWithFrac};
use url::Url;

use crate::{alertmanager_webhook_receiver::AlertReceiverSettings, log::LogSettings, transformer::Branding};

static SETTINGS: OnceCell<Settings> = OnceCell::new();

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub receiver: AlertReceiverSettings,
    pub discord: DiscordSettings,
    #[serde(default)]
    pub branding: Branding,
    pub log: LogSettings,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordSettings {
    /// webhook url including id and token, treat it as a secret
    pub webhook_url: Url,
    /// upper bound for a single delivery
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub timeout: Duration,
}

/// values taken from the command line or the environment, they win over the
/// config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub webhook_url: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    /// `DEBUG=true` forces debug logging
    pub debug: bool,
}

impl Settings {
    pub fn global() -> &'static Self {
        SETTINGS.get_or_init(|| {
            match Self::load().context("failed to load config and command line arguments") {
                Ok(settings) => settings,
                Err(err) => {
                    // tracing wasn't setup yet
                    panic!("{:#?}", err);
                }
            }
        })
    }

    fn load() -> Result<Self> {
        let opts = Command::new(clap::crate_name!())
            .version(clap::crate_version!())
            .about(clap::crate_description!())
            .author(clap::crate_authors!())
            .args([
                Arg::new("config")
                    .help("path of config file, may be missing")
                    .takes_value(true)
                    .short('c')
                    .long("config")
                    .default_value("./config.yaml"),
                Arg::new("webhook-url")
                    .help("discord webhook url")
                    .takes_value(true)
                    .long("webhook-url")
                    .env("DISCORD_WEBHOOK_URL")
                    .hide_env_values(true),
                Arg::new("port")
                    .help("port of the webhook receiver")
                    .takes_value(true)
                    .long("port")
                    .env("PORT"),
                Arg::new("level")
                    .help("log level")
                    .possible_values(["Error", "Warn", "Info", "Debug", "Trace"])
                    .ignore_case(true)
                    .takes_value(true)
                    .long("log")
                    .env("LOG_LEVEL"),
                Arg::new("log-format")
                    .help("log output format")
                    .possible_values(["pretty", "json"])
                    .ignore_case(true)
                    .takes_value(true)
                    .long("log-format")
                    .env("LOG_FORMAT"),
                Arg::new("debug")
                    .help("shorthand for debug logging")
                    .takes_value(true)
                    .long("debug")
                    .env("DEBUG")
                    .hide(true),
            ])
            .get_matches();

        let port = opts
            .value_of("port")
            .map(str::parse::<u16>)
            .transpose()
            .context("invalid port")?;

        let overrides = Overrides {
            webhook_url: opts.value_of("webhook-url").map(str::to_owned),
            port,
            log_level: opts.value_of("level").map(str::to_owned),
            log_format: opts.value_of("log-format").map(str::to_owned),
            debug: opts.value_of("debug").map_or(false, |value| value.eq_ignore_ascii_case("true")),
        };

        // config_path always has a value because of the default
        let config_path = opts.value_of("config").unwrap_or("./config.yaml");

        Self::build(config::File::with_name(config_path).required(false), &overrides)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("receiver.bind_address", "0.0.0.0")?
            .set_default("receiver.port", 8888_i64)?
            .set_default("discord.timeout", 10.0)?
            .set_default("log.level", "info")?
            .set_default("log.format", "json")?)
    }

    /// Layers defaults, `file` and `overrides`, later layers win.
    pub fn build<S>(file: S, overrides: &Overrides) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let mut builder = Self::defaults()?.add_source(file);

        if let Some(url) = &overrides.webhook_url {
            builder = builder.set_override("discord.webhook_url", url.as_str())?;
        }
        if let Some(port) = overrides.port {
            builder = builder.set_override("receiver.port", i64::from(port))?;
        }
        if overrides.debug {
            builder = builder.set_override("log.level", "debug")?;
        } else if let Some(level) = &overrides.log_level {
            builder = builder.set_override("log.level", level.as_str())?;
        }
        if let Some(format) = &overrides.log_format {
            builder = builder.set_override("log.format", format.to_ascii_lowercase())?;
        }

        let settings: Self = builder
            .build()
            .context("can't load config")?
            .try_deserialize()
            .context("can't load config")?;

        Ok(settings)
    }
}
