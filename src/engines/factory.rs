use std::sync::Arc;
use tracing::debug;

use crate::config::SourceConfiguration;
use crate::database::{create_database_connection, DatabaseConnection, DatabaseType};
use crate::engines::mysql::{MySqlColumnNormalizer, MySqlScanner};
use crate::engines::Scanner;
use crate::error::{Error, Result};

/// Builds the scanner triad for a configured engine tag.
///
/// Only MySQL has a scanner; every other tag, known or not, fails with
/// [`Error::UnsupportedEngine`] before any query is issued.
pub struct Factory;

impl Factory {
    /// Resolve the engine tag of `config` to an engine that can be scanned.
    pub fn engine(config: &SourceConfiguration) -> Result<DatabaseType> {
        match config.engine.parse::<DatabaseType>() {
            Ok(DatabaseType::MySql) => Ok(DatabaseType::MySql),
            Ok(_) | Err(_) => Err(Error::UnsupportedEngine(config.engine.clone())),
        }
    }

    /// Construct the scanner for `config` on top of an existing executor.
    ///
    /// The executor must speak the configured engine.
    pub fn scanner(
        config: &SourceConfiguration,
        connection: Arc<dyn DatabaseConnection>,
    ) -> Result<Box<dyn Scanner>> {
        let engine = Self::engine(config)?;
        let executor = connection.get_database_type();
        if executor != engine {
            return Err(Error::Connection(format!(
                "executor for {} cannot scan a {} source",
                executor, engine
            )));
        }

        match engine {
            DatabaseType::MySql => {
                debug!(
                    engine = %config.engine,
                    database = %config.connection.database,
                    "Creating MySQL scanner"
                );
                let scanner = MySqlScanner::new(
                    connection,
                    config.connection.database.clone(),
                    MySqlColumnNormalizer::new(),
                    config.excludes.iter().cloned(),
                )
                .with_concurrency(config.concurrency);
                Ok(Box::new(scanner))
            }
            other => Err(Error::UnsupportedEngine(other.to_string())),
        }
    }

    /// Open an executor for `config`, checking the engine tag first.
    pub async fn connect(config: &SourceConfiguration) -> Result<Arc<dyn DatabaseConnection>> {
        let engine = Self::engine(config)?;
        Ok(create_database_connection(engine, &config.connection).await?)
    }
}
