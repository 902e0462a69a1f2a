// Engine capability contracts
//
// Each supported engine provides one Scanner / ColumnNormalizer /
// RelationResolver triad; the Factory picks the triad by engine tag.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;

pub mod factory;
pub mod model;
pub mod mysql;
pub mod types;

pub use factory::Factory;
pub use model::{
    Column, Index, IndexType, Item, Items, PrimaryKey, Relation, RelationType, SemanticType,
    SubType, TableRef,
};
pub use types::{TypeInfo, TypeTable};

/// Produces the normalized model of one database.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Base table names in enumeration order, before exclusions.
    async fn tables(&self) -> Result<Vec<String>>;

    /// Scan every non-excluded base table.
    ///
    /// Returns items in table enumeration order, or the first error hit;
    /// never a partial list.
    async fn scan(&self) -> Result<Items>;
}

/// Turns one engine-specific column descriptor into a [`Column`].
pub trait ColumnNormalizer: Send + Sync {
    /// Raw descriptor as produced by the engine's column introspection query
    type Raw;

    fn normalize(&self, raw: &Self::Raw) -> Result<Column>;
}

/// Keys and relations read from one table's definition text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableConstraints {
    pub primary_key: PrimaryKey,
    pub indexes: Vec<Index>,
    /// `belongs-to` relations of the table itself
    pub relations: Vec<Relation>,
    /// `has-many` relations owed to other tables of the same database, keyed by table name
    pub reciprocals: Vec<(String, Relation)>,
}

/// Extracts keys and relations from a table definition.
pub trait RelationResolver: Send + Sync {
    /// Fails with [`crate::Error::Definition`] when the text does not parse.
    fn resolve(&self, table: &str, definition: &str) -> Result<TableConstraints>;
}

/// Scan-scoped store of `has-many` relations waiting for their target item.
#[derive(Debug, Default)]
pub(crate) struct PendingRelations {
    by_table: HashMap<String, Vec<Relation>>,
}

impl PendingRelations {
    pub(crate) fn push(&mut self, table: String, relation: Relation) {
        self.by_table.entry(table).or_default().push(relation);
    }

    /// Append every pending relation to its target item. Entries for tables
    /// without an item (excluded or foreign) are dropped.
    pub(crate) fn merge_into(mut self, items: &mut [Item]) {
        for item in items.iter_mut() {
            if let Some(relations) = self.by_table.remove(&item.table) {
                item.relations.extend(relations);
            }
        }
    }
}
