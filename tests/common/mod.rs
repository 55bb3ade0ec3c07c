use sensor_historian::config::{Config, ConsumerConfig, KafkaConfig, SinkConfig, WriterConfig};
use std::env;

/// Get test configuration from environment variables
#[allow(dead_code)]
pub fn get_test_config() -> Config {
    // Use TEST_ prefix for test environment variables
    let sink = SinkConfig {
        host: env::var("TEST_PG_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: env::var("TEST_PG_PORT")
            .unwrap_or_else(|_| "5432".to_string())
            .parse()
            .unwrap_or(5432),
        database: env::var("TEST_PG_DATABASE").unwrap_or_else(|_| "postgres".to_string()),
        username: env::var("TEST_PG_USERNAME").unwrap_or_else(|_| "postgres".to_string()),
        password: env::var("TEST_PG_PASSWORD").unwrap_or_else(|_| "postgres".to_string()),
        schema: "public".to_string(),
        table: format!("eventlog_test_{}", std::process::id()),
        connect_timeout_secs: 5,
    };

    let kafka = KafkaConfig {
        brokers: env::var("TEST_KAFKA_BROKERS")
            .unwrap_or_else(|_| "localhost:9092".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect(),
        group_id: format!("historian_test_{}", std::process::id()),
        security_protocol: "PLAINTEXT".to_string(),
        sasl_mechanism: "PLAIN".to_string(),
        sasl_username: None,
        sasl_password: None,
        ssl_ca_location: None,
        auto_offset_reset: Some("earliest".to_string()),
        topics: vec![format!("house_test_{}", std::process::id())],
    };

    let writer = WriterConfig {
        max_batch_size: 100,
        flush_interval_secs: 1, // Frequent flushes for tests
    };

    let consumer = ConsumerConfig {
        max_retries: 3,
        retry_delay_secs: 1,
        poll_timeout_ms: 500,
    };

    Config {
        sink,
        kafka,
        writer,
        consumer,
    }
}

/// Table layout the insert statement expects.
#[allow(dead_code)]
pub fn create_table_sql(schema: &str, table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {schema}.{table} (
            \"timestamp\" TIMESTAMPTZ NOT NULL,
            \"key\" TEXT NOT NULL,
            \"description\" TEXT NOT NULL,
            \"building_name\" TEXT NOT NULL,
            \"floor_name\" TEXT NOT NULL,
            \"room_name\" TEXT NOT NULL,
            \"service_type\" TEXT NOT NULL,
            \"object_name\" TEXT NOT NULL,
            \"measurement_type\" TEXT NOT NULL,
            \"unit_of_measure\" TEXT NOT NULL,
            \"data\" TEXT NOT NULL,
            \"float_data\" DOUBLE PRECISION
        )"
    )
}
