//! Error types and result handling for sensor-historian.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! Only a few variants are fatal for the process: a sink that cannot be
//! opened, an exhausted consumer retry budget, and invalid configuration.
//! Everything else is logged and absorbed by the loop that produced it.
//!
//! # Example
//!
//! ```rust
//! use sensor_historian::{Error, Result};
//!
//! fn connect_to_broker() -> Result<()> {
//!     Err(Error::Connection("broker unreachable".to_string()))
//! }
//!
//! match connect_to_broker() {
//!     Ok(()) => println!("Connected"),
//!     Err(Error::Connection(msg)) => eprintln!("Connection error: {}", msg),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for sensor-historian operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, from a bad file, environment variable or value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// PostgreSQL client or statement error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Kafka client or consumer error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// JSON error when decoding message payloads.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connection error not covered by the client specific variants.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A bulk insert against the sink failed.
    #[error("Write error: {message}")]
    Write {
        /// Description of the failed write
        message: String,
    },

    /// Invalid or malformed stream message.
    #[error("Invalid message format: {message}")]
    InvalidMessage {
        /// Description of what was invalid
        message: String,
    },

    /// The stream consumer failed on every allowed connection attempt.
    #[error("Giving up after {attempts} connection attempts")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
    },

    /// The ingestion queue has no receiver left.
    #[error("Ingestion queue closed")]
    QueueClosed,

    /// A background task panicked or was cancelled.
    #[error("Task error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A convenient Result type alias for sensor-historian operations.
///
/// This is equivalent to `std::result::Result<T, sensor_historian::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
