use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::Row;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::database::{
    ConnectionConfig, DatabaseConnection, DatabaseError, DatabaseResult, DatabaseRow, DatabaseType,
};

/// MySQL implementation of the query executor
#[derive(Clone)]
pub struct MySqlConnection {
    pool: Arc<MySqlPool>,
}

impl MySqlConnection {
    /// Create a new MySQL connection pool from a configuration
    pub async fn connect(config: &ConnectionConfig) -> DatabaseResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool.max_connections)
            .min_connections(config.pool.min_connections)
            .acquire_timeout(Duration::from_secs(config.pool.acquire_timeout_seconds))
            .connect_with(build_connect_options(config))
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        debug!(host = %config.host, port = config.port, database = %config.database, "Connected to MySQL");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn build_connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database);

    if let Some(user) = &config.user {
        options = options.username(user);
    }
    if let Some(password) = &config.password {
        options = options.password(password.expose_secret());
    }

    options
}

/// MySQL implementation of the database row interface
pub struct MySqlRow {
    row: sqlx::mysql::MySqlRow,
}

impl MySqlRow {
    // SHOW statements report their columns as binary strings on some server
    // versions, which the String decoder rejects.
    fn decode(&self, column: &str) -> Result<Option<String>, sqlx::Error> {
        match self.row.try_get::<Option<String>, _>(column) {
            Err(sqlx::Error::ColumnDecode { .. }) => self
                .row
                .try_get::<Option<Vec<u8>>, _>(column)
                .map(|bytes| bytes.map(|b| String::from_utf8_lossy(&b).into_owned())),
            other => other,
        }
    }
}

impl DatabaseRow for MySqlRow {
    fn get_string(&self, column: &str) -> DatabaseResult<String> {
        match self.decode(column) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(DatabaseError::Query(format!("column {} is NULL", column))),
            Err(e) => Err(DatabaseError::Query(format!(
                "Failed to get string column {}: {}",
                column, e
            ))),
        }
    }

    fn try_get_string(&self, column: &str) -> DatabaseResult<Option<String>> {
        match self.decode(column) {
            Ok(value) => Ok(value),
            Err(sqlx::Error::ColumnNotFound(_)) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!(
                "Failed to get string column {}: {}",
                column, e
            ))),
        }
    }
}

#[async_trait]
impl DatabaseConnection for MySqlConnection {
    async fn query(&self, query: &str) -> DatabaseResult<Vec<Box<dyn DatabaseRow>>> {
        // Text protocol: SHOW statements are not all preparable.
        sqlx::raw_sql(query)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))
            .map(|rows| {
                rows.into_iter()
                    .map(|row| Box::new(MySqlRow { row }) as Box<dyn DatabaseRow>)
                    .collect()
            })
    }

    fn get_database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    async fn close(&self) -> DatabaseResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
