use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Error type for query executor operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Query error
    #[error("query error: {0}")]
    Query(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for query executor operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Database engine tags understood by the executor layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// PostgreSQL database
    Postgres,
    /// MySQL database
    MySql,
    /// SQLite database
    Sqlite,
}

impl Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseType::Postgres => write!(f, "postgres"),
            DatabaseType::MySql => write!(f, "mysql"),
            DatabaseType::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for DatabaseType {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DatabaseType::Postgres),
            "mysql" | "mariadb" => Ok(DatabaseType::MySql),
            "sqlite" => Ok(DatabaseType::Sqlite),
            other => Err(DatabaseError::Configuration(format!(
                "unknown database type: {}",
                other
            ))),
        }
    }
}

/// Connection parameters for one database server
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Database host
    #[serde(default = "default_host")]
    pub host: String,

    /// Database port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database user
    #[serde(default, alias = "username")]
    pub user: Option<String>,

    /// Database password
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Environment variable to read the password from when `password` is unset
    #[serde(default)]
    pub password_env: Option<String>,

    /// Name of the database (schema) being scanned
    pub database: String,

    /// Connection pool settings
    #[serde(default)]
    pub pool: PoolConfig,
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    3306
}

impl ConnectionConfig {
    /// Create a configuration for `database` on localhost with default settings.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: None,
            password: None,
            password_env: None,
            database: database.into(),
            pool: PoolConfig::default(),
        }
    }
}

/// Configuration for connection pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquisition timeout
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_acquire_timeout() -> u64 {
    30
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_seconds: default_acquire_timeout(),
        }
    }
}

/// A single row returned by the query executor
pub trait DatabaseRow: Send + Sync {
    /// Get a column value by name; a missing column or NULL is an error
    fn get_string(&self, column: &str) -> DatabaseResult<String>;

    /// Try to get a column value by name, returning None if the column doesn't exist or is NULL
    fn try_get_string(&self, column: &str) -> DatabaseResult<Option<String>>;
}

/// Query executor capability consumed by the scanners
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Execute a query that returns rows, in the order the server sent them
    async fn query(&self, query: &str) -> DatabaseResult<Vec<Box<dyn DatabaseRow>>>;

    /// Get the underlying database type
    fn get_database_type(&self) -> DatabaseType;

    /// Close the connection
    async fn close(&self) -> DatabaseResult<()>;
}

/// Open a query executor for the given engine.
pub async fn create_database_connection(
    db_type: DatabaseType,
    config: &ConnectionConfig,
) -> DatabaseResult<Arc<dyn DatabaseConnection>> {
    match db_type {
        DatabaseType::MySql => {
            #[cfg(feature = "mysql")]
            {
                let conn = mysql::MySqlConnection::connect(config).await?;
                Ok(Arc::new(conn) as Arc<dyn DatabaseConnection>)
            }
            #[cfg(not(feature = "mysql"))]
            {
                let _ = config;
                Err(DatabaseError::Configuration(
                    "MySQL support is not enabled. Enable the 'mysql' feature.".to_string(),
                ))
            }
        }
        other => Err(DatabaseError::Configuration(format!(
            "no executor available for {}",
            other
        ))),
    }
}

pub mod memory;
pub use memory::MemoryConnection;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "mysql")]
pub use mysql::MySqlConnection;
