use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::config::SourceConfiguration;
use crate::database::DatabaseConnection;
use crate::engines::{Factory, Item, Items};
use crate::error::Result;

/// In-place edit applied to every scanned item.
pub type Transformer = Arc<dyn Fn(&mut Item) + Send + Sync>;

/// Loads the normalized model of one database and hands it to consumers.
///
/// Each [`load`](Source::load) runs a fresh scan and then applies the
/// transformers in the order they were given, each one to every item in
/// table order, before the next transformer runs. A failed load leaves the
/// previous snapshot untouched.
pub struct Source {
    configuration: SourceConfiguration,
    transformers: Vec<Transformer>,
    connection: Option<Arc<dyn DatabaseConnection>>,
    items: Items,
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("configuration", &self.configuration)
            .field("transformers", &self.transformers.len())
            .field("connected", &self.connection.is_some())
            .field("items", &self.items.len())
            .finish()
    }
}

impl Source {
    pub fn new(configuration: SourceConfiguration, transformers: Vec<Transformer>) -> Self {
        Self {
            configuration,
            transformers,
            connection: None,
            items: Vec::new(),
        }
    }

    /// Use an already open executor instead of connecting on first load.
    pub fn with_connection(mut self, connection: Arc<dyn DatabaseConnection>) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Append a transformer after the ones already registered.
    pub fn transformer<F>(mut self, transformer: F) -> Self
    where
        F: Fn(&mut Item) + Send + Sync + 'static,
    {
        self.transformers.push(Arc::new(transformer));
        self
    }

    pub fn configuration(&self) -> &SourceConfiguration {
        &self.configuration
    }

    /// Scan the database and replace the current snapshot.
    #[instrument(skip(self), fields(database = %self.configuration.connection.database))]
    pub async fn load(&mut self) -> Result<()> {
        let connection = match &self.connection {
            Some(connection) => connection.clone(),
            None => {
                let connection = Factory::connect(&self.configuration).await?;
                self.connection = Some(connection.clone());
                connection
            }
        };

        let scanner = Factory::scanner(&self.configuration, connection)?;
        let mut items = scanner.scan().await?;

        for transformer in &self.transformers {
            for item in items.iter_mut() {
                transformer(item);
            }
        }
        debug!(transformers = self.transformers.len(), "Applied transformers");

        self.items = items;
        info!(items = self.items.len(), "Source loaded");
        Ok(())
    }

    /// Current snapshot; empty until the first successful load.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn into_items(self) -> Items {
        self.items
    }

    /// Close the executor, if one was opened or supplied.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close().await?;
        }
        Ok(())
    }
}
