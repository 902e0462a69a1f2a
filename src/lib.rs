//! Schema introspection for relational databases.
//!
//! A [`Source`] asks the [`Factory`](engines::Factory) for the scanner of its
//! configured engine, scans every base table into a normalized [`Item`],
//! and runs caller-supplied transformers over the result. Only MySQL has a
//! scanner today.

pub mod config;
pub mod database;
pub mod engines;
pub mod error;
mod logging;
pub mod source;


pub use config::{ConfigFormat, SourceConfiguration};
pub use database::{
    create_database_connection, ConnectionConfig, DatabaseConnection, DatabaseError,
    DatabaseResult, DatabaseRow, DatabaseType, PoolConfig,
};
pub use engines::{
    Column, ColumnNormalizer, Factory, Index, IndexType, Item, Items, PrimaryKey, Relation,
    RelationResolver, RelationType, Scanner, SemanticType, SubType, TableRef,
};
pub use error::{ConfigError, Error, Result};
pub use logging::init_logging;
pub use source::{Source, Transformer};
