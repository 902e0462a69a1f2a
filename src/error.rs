use crate::database::DatabaseError;
use std::io;
use thiserror::Error;

/// Unified error type for schema scanning
#[derive(Debug, Error)]
pub enum Error {
    /// The query executor could not be set up or could not reach the server
    #[error("connection error: {0}")]
    Connection(String),

    /// A single query failed or returned a result without a required field
    #[error("query error: {0}")]
    Query(String),

    /// A column type token does not start with an identifier
    #[error("malformed type `{token}` on column `{column}`")]
    MalformedType { column: String, token: String },

    /// A table definition could not be parsed
    #[error("unreadable definition of table `{table}`: {message}")]
    Definition { table: String, message: String },

    /// No scanner exists for the configured engine
    #[error("database type not supported: {0}")]
    UnsupportedEngine(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error category for configuration issues
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::Connection(msg) => Error::Connection(msg),
            DatabaseError::Query(msg) => Error::Query(msg),
            DatabaseError::Configuration(msg) => Error::Connection(msg),
        }
    }
}
