use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::database::{DatabaseConnection, DatabaseError, DatabaseResult, DatabaseRow, DatabaseType};

/// A row held in memory: ordered `(column, value)` pairs, `None` meaning NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryRow {
    values: Vec<(String, Option<String>)>,
}

impl MemoryRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column` to a non-NULL value, replacing any earlier value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.put(column.into(), Some(value.into()));
        self
    }

    /// Set `column` to NULL.
    pub fn null(mut self, column: impl Into<String>) -> Self {
        self.put(column.into(), None);
        self
    }

    fn put(&mut self, column: String, value: Option<String>) {
        match self.values.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    fn lookup(&self, column: &str) -> Option<&Option<String>> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

impl DatabaseRow for MemoryRow {
    fn get_string(&self, column: &str) -> DatabaseResult<String> {
        match self.lookup(column) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(DatabaseError::Query(format!("column {} is NULL", column))),
            None => Err(DatabaseError::Query(format!("no column named {}", column))),
        }
    }

    fn try_get_string(&self, column: &str) -> DatabaseResult<Option<String>> {
        Ok(self.lookup(column).cloned().flatten())
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Rows(Vec<MemoryRow>),
    Failure(String),
}

/// A query executor that answers from canned results keyed by exact SQL text.
///
/// Useful for running the scan pipeline without a server, e.g. in tests or
/// against a captured schema. Queries without a scripted answer fail with
/// [`DatabaseError::Query`].
#[derive(Debug)]
pub struct MemoryConnection {
    db_type: DatabaseType,
    responses: HashMap<String, Scripted>,
    executed: Mutex<Vec<String>>,
}

impl MemoryConnection {
    pub fn new(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            responses: HashMap::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Answer `sql` with `rows`.
    pub fn with_rows(mut self, sql: impl Into<String>, rows: Vec<MemoryRow>) -> Self {
        self.responses.insert(sql.into(), Scripted::Rows(rows));
        self
    }

    /// Fail `sql` with a query error carrying `message`.
    pub fn with_failure(mut self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses
            .insert(sql.into(), Scripted::Failure(message.into()));
        self
    }

    /// Every query received so far, in arrival order.
    pub async fn executed(&self) -> Vec<String> {
        self.executed.lock().await.clone()
    }
}

#[async_trait]
impl DatabaseConnection for MemoryConnection {
    async fn query(&self, query: &str) -> DatabaseResult<Vec<Box<dyn DatabaseRow>>> {
        self.executed.lock().await.push(query.to_string());
        debug!(query = %query, "Answering query from memory");

        match self.responses.get(query) {
            Some(Scripted::Rows(rows)) => Ok(rows
                .iter()
                .cloned()
                .map(|row| Box::new(row) as Box<dyn DatabaseRow>)
                .collect()),
            Some(Scripted::Failure(message)) => Err(DatabaseError::Query(message.clone())),
            None => Err(DatabaseError::Query(format!(
                "no result scripted for query: {}",
                query
            ))),
        }
    }

    fn get_database_type(&self) -> DatabaseType {
        self.db_type
    }

    async fn close(&self) -> DatabaseResult<()> {
        Ok(())
    }
}
