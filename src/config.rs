use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "HISTORIAN";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub sink: SinkConfig,
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub writer: WriterConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SinkConfig {
    pub host: String,
    #[serde(default = "default_sink_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub database: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub group_id: String,
    #[serde(default = "default_security_protocol")]
    pub security_protocol: String,
    #[serde(default = "default_sasl_mechanism")]
    pub sasl_mechanism: String,
    #[serde(default)]
    pub sasl_username: Option<String>,
    #[serde(default)]
    pub sasl_password: Option<String>,
    #[serde(default)]
    pub ssl_ca_location: Option<String>,
    #[serde(default)]
    pub auto_offset_reset: Option<String>,
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WriterConfig {
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsumerConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

impl Config {
    /// Loads configuration from an optional TOML file overlaid with
    /// `HISTORIAN_*` environment variables (`__` separates nested keys).
    pub fn load(path: Option<&Path>) -> std::result::Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("kafka.brokers")
                    .with_list_parse_key("kafka.topics")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, config::ConfigError> {
        Self::load(Some(path.as_ref()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.writer.max_batch_size == 0 {
            return Err(Error::Config("writer.max_batch_size must be greater than zero".into()));
        }
        if self.writer.flush_interval_secs == 0 {
            return Err(Error::Config(
                "writer.flush_interval_secs must be greater than zero".into(),
            ));
        }
        if self.consumer.max_retries == 0 {
            return Err(Error::Config("consumer.max_retries must be greater than zero".into()));
        }
        if self.kafka.brokers.is_empty() {
            return Err(Error::Config("kafka.brokers must not be empty".into()));
        }
        if self.kafka.topics.is_empty() {
            return Err(Error::Config("kafka.topics must not be empty".into()));
        }
        Ok(())
    }
}

impl SinkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl WriterConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

impl ConsumerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

fn default_sink_port() -> u16 {
    443
}

fn default_database() -> String {
    "postgres".to_string()
}

fn default_schema() -> String {
    "CEV".to_string()
}

fn default_table() -> String {
    "EVENTLOG".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_security_protocol() -> String {
    "SASL_SSL".to_string()
}

fn default_sasl_mechanism() -> String {
    "PLAIN".to_string()
}

fn default_topics() -> Vec<String> {
    (1..=10).map(|n| format!("house_{n}")).collect()
}

fn default_max_batch_size() -> usize {
    5000
}

fn default_flush_interval_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_poll_timeout_ms() -> u64 {
    1000
}
