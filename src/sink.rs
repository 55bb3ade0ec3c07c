//! The sink side: where batches of readings end up.

use crate::reading::SensorReading;
use crate::Result;
use async_trait::async_trait;

/// A relational store that accepts batches of readings.
///
/// Implementations own their connection and re-establish it when it drops;
/// a lost connection shows up as a failed [`Sink::bulk_insert`], never as a
/// closed sink. The batch writer keeps running for as long as
/// [`Sink::is_open`] holds.
#[async_trait]
pub trait Sink: Send {
    /// Writes the whole batch with a single bulk call and returns the number
    /// of rows written.
    async fn bulk_insert(&mut self, rows: &[SensorReading]) -> Result<u64>;

    /// False once [`Sink::close`] has been called.
    fn is_open(&self) -> bool;

    /// Releases the connection. Calling it again is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Parameterized insert for the historian table, built once per sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    sql: String,
}

impl InsertStatement {
    pub fn new(schema: &str, table: &str) -> Self {
        let columns = SensorReading::COLUMNS
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(",");

        // $1 is the ISO-8601 text of the timestamp.
        let placeholders = std::iter::once("CAST($1::text AS timestamptz)".to_string())
            .chain((2..=SensorReading::COLUMNS.len()).map(|n| format!("${n}")))
            .collect::<Vec<_>>()
            .join(",");

        Self {
            sql: format!("INSERT INTO {schema}.{table}({columns}) VALUES({placeholders});"),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}
