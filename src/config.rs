//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` and can be set via the
//! `-f` flag or `CALLSIGHT_CONFIG`. Environment variables prefixed with
//! `CALLSIGHT_` override YAML values; nested keys use double underscores,
//! e.g. `CALLSIGHT_CLASSIFIER__BATCH_SIZE=100`. `DATABASE_URL`, when set,
//! overrides `database.url`.
//!
//! The resulting [`Config`] is immutable and passed to every component at
//! construction; nothing reads configuration from ambient global state after
//! startup.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "CALLSIGHT_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// PostgreSQL connection settings
    pub database: DatabaseConfig,
    /// Batch classifier settings (schedule, batch size, queue TTL)
    pub classifier: ClassifierConfig,
    /// External quality-model configuration. When absent the model tier is
    /// skipped and unmatched queries default to REVIEW.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge: Option<JudgeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3040,
            database: DatabaseConfig::default(),
            classifier: ClassifierConfig::default(),
            judge: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/callsight".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// How often the batch classifier drains the evaluation queue
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Maximum number of queue items processed per run
    pub batch_size: i64,
    /// Time-to-live for work-queue items; items not classified within this
    /// window are dropped silently
    #[serde(with = "humantime_serde")]
    pub queue_ttl: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            batch_size: 50,
            queue_ttl: Duration::from_secs(3600),
        }
    }
}

/// External quality-model (judge) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JudgeConfig {
    /// Base URL of an OpenAI-compatible chat completions API
    pub api_url: Url,
    /// API credential sent as a bearer token
    pub api_key: String,
    /// Model name to request judgments from
    pub model: String,
    /// Hard timeout for a single judgment call
    #[serde(default = "default_judge_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_judge_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Config {
    /// Load configuration from the YAML file and environment overrides.
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Config = Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("CALLSIGHT_").split("__"))
            .extract()?;

        // DATABASE_URL is the conventional override and wins over everything
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }

        Ok(config)
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
