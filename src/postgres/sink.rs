use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Statement};
use tracing::{debug, error, info, warn};

use crate::config::SinkConfig;
use crate::reading::SensorReading;
use crate::sink::{InsertStatement, Sink};
use crate::{Error, Result};

/// A live client with its driver task and the statement prepared on it.
struct Connection {
    client: Client,
    driver: JoinHandle<()>,
    insert: Statement,
}

impl Connection {
    async fn establish(config: &SinkConfig, statement: &InsertStatement) -> Result<Self> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.username)
            .password(&config.password)
            .connect_timeout(config.connect_timeout())
            .application_name("sensor-historian");

        let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
            error!("Failed connecting to PostgreSQL: {}", e);
            Error::Postgres(e)
        })?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Connection error: {}", e);
            }
        });

        debug!(statement = statement.sql(), "Preparing insert statement");
        let insert = match client.prepare(statement.sql()).await {
            Ok(insert) => insert,
            Err(e) => {
                driver.abort();
                return Err(Error::Postgres(e));
            }
        };

        Ok(Self {
            client,
            driver,
            insert,
        })
    }
}

/// [`Sink`] backed by a single tokio-postgres connection.
///
/// The insert statement is prepared once per connection and reused for every
/// batch. Each batch runs in its own transaction, so a failed batch leaves
/// nothing behind. A connection dropped by the server is re-established on
/// the next batch; only [`Sink::close`] takes the sink out of service.
pub struct PostgresSink {
    config: SinkConfig,
    statement: InsertStatement,
    connection: Option<Connection>,
}

impl PostgresSink {
    pub async fn open(config: &SinkConfig, statement: &InsertStatement) -> Result<Self> {
        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Connecting to PostgreSQL"
        );

        let connection = Connection::establish(config, statement).await?;
        info!("Successfully connected to PostgreSQL");

        Ok(Self {
            config: config.clone(),
            statement: statement.clone(),
            connection: Some(connection),
        })
    }
}

fn row_params(row: &SensorReading) -> [&(dyn ToSql + Sync); 12] {
    [
        &row.timestamp,
        &row.key,
        &row.description,
        &row.building_name,
        &row.floor_name,
        &row.room_name,
        &row.service_type,
        &row.object_name,
        &row.measurement_type,
        &row.unit_of_measure,
        &row.data,
        &row.float_data,
    ]
}

#[async_trait]
impl Sink for PostgresSink {
    async fn bulk_insert(&mut self, rows: &[SensorReading]) -> Result<u64> {
        let connection = self.connection.as_mut().ok_or_else(|| Error::Write {
            message: "PostgreSQL sink is closed".to_string(),
        })?;

        if connection.client.is_closed() {
            warn!("PostgreSQL connection lost, reconnecting");
            // On failure the dead connection stays in place and the next
            // batch tries again.
            let fresh = Connection::establish(&self.config, &self.statement).await?;
            connection.driver.abort();
            *connection = fresh;
            info!("Reconnected to PostgreSQL");
        }

        let transaction = connection.client.transaction().await?;
        let mut written = 0;
        for row in rows {
            written += transaction
                .execute(&connection.insert, &row_params(row))
                .await?;
        }
        transaction.commit().await?;

        Ok(written)
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            info!("Closing connection to PostgreSQL");
            connection.driver.abort();
        }
        Ok(())
    }
}
