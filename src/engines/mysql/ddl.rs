//! Reads keys and foreign keys out of `SHOW CREATE TABLE` text.
//!
//! The statement is parsed with the MySQL dialect of `sqlparser`; only the
//! table-level constraints are kept. Key parts are reduced to their column
//! name, so prefix lengths such as `title(50)` are dropped.

use sqlparser::ast::{Expr, Ident, ObjectName, ObjectNamePart, Statement, TableConstraint};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::{Parser, ParserError};

/// Index or key declared in a table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// `FOREIGN KEY (...) REFERENCES [database.]table (...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDefinition {
    pub columns: Vec<String>,
    /// Explicit database qualifier, if the reference had one
    pub database: Option<String>,
    pub table: String,
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDefinition {
    pub primary_key: Option<Vec<String>>,
    pub keys: Vec<KeyDefinition>,
    pub foreign_keys: Vec<ForeignKeyDefinition>,
}

fn name_part(part: &ObjectNamePart) -> Option<String> {
    match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.clone()),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Column named by one key part; `None` for functional key parts.
fn key_part(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(idents) => idents.last().map(|i| i.value.clone()),
        // `title(50)` reads as a call named after the column
        Expr::Function(function) => function.name.0.last().and_then(name_part),
        _ => None,
    }
}

fn idents(idents: &[Ident]) -> Vec<String> {
    idents.iter().map(|ident| ident.value.clone()).collect()
}

/// Split `[database.]table`.
fn table_reference(name: &ObjectName) -> Option<(Option<String>, String)> {
    let parts: Vec<String> = name.0.iter().filter_map(name_part).collect();
    match parts.as_slice() {
        [table] => Some((None, table.clone())),
        [.., database, table] => Some((Some(database.clone()), table.clone())),
        [] => None,
    }
}

fn push_key(
    definition: &mut TableDefinition,
    name: Option<&Ident>,
    unique: bool,
    columns: Vec<String>,
) {
    // Keys without a name or without plain columns are not reported
    if let Some(name) = name {
        if !columns.is_empty() {
            definition.keys.push(KeyDefinition {
                name: name.value.clone(),
                unique,
                columns,
            });
        }
    }
}

fn collect(constraint: &TableConstraint, definition: &mut TableDefinition) {
    match constraint {
        TableConstraint::PrimaryKey(primary) => {
            if definition.primary_key.is_none() {
                definition.primary_key = Some(
                    primary
                        .columns
                        .iter()
                        .filter_map(|part| key_part(&part.column.expr))
                        .collect(),
                );
            }
        }
        TableConstraint::Unique(unique) => {
            let columns = unique
                .columns
                .iter()
                .filter_map(|part| key_part(&part.column.expr))
                .collect();
            let name = unique.index_name.as_ref().or(unique.name.as_ref());
            push_key(definition, name, true, columns);
        }
        TableConstraint::Index(index) => {
            let columns = index
                .columns
                .iter()
                .filter_map(|part| key_part(&part.column.expr))
                .collect();
            push_key(definition, index.name.as_ref(), false, columns);
        }
        TableConstraint::FulltextOrSpatial(index) => {
            let columns = index
                .columns
                .iter()
                .filter_map(|part| key_part(&part.column.expr))
                .collect();
            push_key(definition, index.opt_index_name.as_ref(), false, columns);
        }
        TableConstraint::ForeignKey(foreign) => {
            if let Some((database, table)) = table_reference(&foreign.foreign_table) {
                definition.foreign_keys.push(ForeignKeyDefinition {
                    columns: idents(&foreign.columns),
                    database,
                    table,
                    references: idents(&foreign.referred_columns),
                });
            }
        }
        _ => {}
    }
}

/// Extracts primary key, indexes and foreign keys from a `CREATE TABLE` statement.
///
/// Text holding no `CREATE TABLE` yields an empty definition.
pub fn parse_table_definition(sql: &str) -> Result<TableDefinition, ParserError> {
    let statements = Parser::parse_sql(&MySqlDialect {}, sql)?;
    let mut definition = TableDefinition::default();

    for statement in &statements {
        if let Statement::CreateTable(create) = statement {
            for constraint in &create.constraints {
                collect(constraint, &mut definition);
            }
            break;
        }
    }
    Ok(definition)
}
