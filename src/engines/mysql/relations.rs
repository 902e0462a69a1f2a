use tracing::debug;

use crate::engines::model::{Index, IndexType, PrimaryKey, Relation, RelationType, TableRef};
use crate::engines::mysql::ddl::{parse_table_definition, ForeignKeyDefinition};
use crate::engines::{RelationResolver, TableConstraints};
use crate::error::{Error, Result};

/// Resolves keys and foreign-key relations from `SHOW CREATE TABLE` text.
///
/// References without a database qualifier belong to `database`, the one
/// being scanned. Only those get a reciprocal `has-many`: tables in other
/// databases are outside the scan.
#[derive(Debug, Clone)]
pub struct MySqlRelationResolver {
    database: String,
}

impl MySqlRelationResolver {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    fn belongs_to(&self, fk: ForeignKeyDefinition) -> Relation {
        Relation {
            relation_type: RelationType::BelongsTo,
            columns: fk.columns,
            references: fk.references,
            on: TableRef {
                database: fk.database.unwrap_or_else(|| self.database.clone()),
                table: fk.table,
            },
        }
    }
}

impl RelationResolver for MySqlRelationResolver {
    fn resolve(&self, table: &str, definition: &str) -> Result<TableConstraints> {
        let parsed = parse_table_definition(definition).map_err(|e| Error::Definition {
            table: table.to_string(),
            message: e.to_string(),
        })?;

        let indexes = parsed
            .keys
            .into_iter()
            .map(|key| Index {
                index_type: if key.unique {
                    IndexType::Unique
                } else {
                    IndexType::Index
                },
                index: key.name,
                columns: key.columns,
            })
            .collect();

        let mut constraints = TableConstraints {
            primary_key: PrimaryKey {
                columns: parsed.primary_key.unwrap_or_default(),
            },
            indexes,
            ..Default::default()
        };

        for fk in parsed.foreign_keys {
            let relation = self.belongs_to(fk);
            debug!(
                table = %table,
                referenced_database = %relation.on.database,
                referenced_table = %relation.on.table,
                "Resolved foreign key"
            );

            if relation.on.database == self.database {
                let reciprocal = relation.reciprocal(TableRef {
                    database: self.database.clone(),
                    table: table.to_string(),
                });
                constraints
                    .reciprocals
                    .push((relation.on.table.clone(), reciprocal));
            }
            constraints.relations.push(relation);
        }

        Ok(constraints)
    }
}
