use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::database::DatabaseConnection;
use crate::engines::model::{Column, Item, Items, Relation};
use crate::engines::mysql::column::{MySqlColumn, MySqlColumnNormalizer};
use crate::engines::mysql::relations::MySqlRelationResolver;
use crate::engines::{ColumnNormalizer, PendingRelations, RelationResolver, Scanner};
use crate::error::{Error, Result};

/// Per-table fetches allowed in flight when nothing else is configured
pub const DEFAULT_CONCURRENCY: usize = 4;

fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// Scans one MySQL database through `SHOW` statements.
pub struct MySqlScanner {
    connection: Arc<dyn DatabaseConnection>,
    database: String,
    excludes: HashSet<String>,
    concurrency: usize,
    normalizer: MySqlColumnNormalizer,
    resolver: MySqlRelationResolver,
}

impl MySqlScanner {
    pub fn new<I>(
        connection: Arc<dyn DatabaseConnection>,
        database: impl Into<String>,
        normalizer: MySqlColumnNormalizer,
        excludes: I,
    ) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let database = database.into();
        Self {
            connection,
            resolver: MySqlRelationResolver::new(database.clone()),
            database,
            excludes: excludes.into_iter().collect(),
            concurrency: DEFAULT_CONCURRENCY,
            normalizer,
        }
    }

    /// Limit the number of tables fetched at once (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn qualified(&self, table: &str) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.database),
            quote_identifier(table)
        )
    }

    async fn columns(&self, table: &str) -> Result<Vec<Column>> {
        let sql = format!("SHOW FULL COLUMNS FROM {}", self.qualified(table));
        let rows = self.connection.query(&sql).await?;

        rows.iter()
            .map(|row| {
                let raw = MySqlColumn::from_row(&**row)?;
                self.normalizer.normalize(&raw)
            })
            .collect()
    }

    async fn definition(&self, table: &str) -> Result<String> {
        let sql = format!("SHOW CREATE TABLE {}", self.qualified(table));
        let rows = self.connection.query(&sql).await?;

        let row = rows
            .first()
            .ok_or_else(|| Error::Query(format!("no definition returned for table {}", table)))?;
        Ok(row.get_string("Create Table")?)
    }

    /// Builds the item for one table along with the reciprocal relations it
    /// owes to other tables.
    async fn table(&self, name: String) -> Result<(Item, Vec<(String, Relation)>)> {
        let columns = self.columns(&name).await?;
        let definition = self.definition(&name).await?;
        let constraints = self.resolver.resolve(&name, &definition)?;

        debug!(
            table = %name,
            columns = columns.len(),
            indexes = constraints.indexes.len(),
            relations = constraints.relations.len(),
            "Fetched table"
        );

        let item = Item {
            schema: self.database.clone(),
            columns,
            indexes: constraints.indexes,
            relations: constraints.relations,
            primary_key: constraints.primary_key,
            table: name,
        };
        Ok((item, constraints.reciprocals))
    }
}

#[async_trait]
impl Scanner for MySqlScanner {
    async fn tables(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SHOW FULL TABLES FROM {} WHERE Table_type = 'BASE TABLE'",
            quote_identifier(&self.database)
        );
        let key = format!("Tables_in_{}", self.database);

        let rows = self.connection.query(&sql).await?;
        rows.iter()
            .map(|row| row.get_string(&key).map_err(Error::from))
            .collect()
    }

    #[instrument(skip(self), fields(database = %self.database))]
    async fn scan(&self) -> Result<Items> {
        let tables = self.tables().await?;
        let (included, excluded): (Vec<String>, Vec<String>) = tables
            .into_iter()
            .partition(|table| !self.excludes.contains(table));

        info!(
            tables = included.len(),
            excluded = excluded.len(),
            concurrency = self.concurrency,
            "Scanning tables"
        );

        // `buffered` keeps enumeration order; the first error drops the
        // fetches still in flight.
        let fetched: Vec<(Item, Vec<(String, Relation)>)> = stream::iter(included)
            .map(|table| self.table(table))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut pending = PendingRelations::default();
        let mut items = Vec::with_capacity(fetched.len());
        for (item, reciprocals) in fetched {
            for (target, relation) in reciprocals {
                pending.push(target, relation);
            }
            items.push(item);
        }
        pending.merge_into(&mut items);

        info!(items = items.len(), "Scan complete");
        Ok(items)
    }
}
