use marquee_booking::BookingPolicy;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    #[serde(default)]
    pub policy: BookingPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// "memory" or "postgres".
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Capacity of the booking-event broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_event_buffer() -> usize {
    100
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file, not checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of MARQUEE)
            // E.g. `MARQUEE__DATABASE__URL=...` would set `database.url`
            .add_source(config::Environment::with_prefix("MARQUEE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
