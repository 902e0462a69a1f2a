//! Normalized, engine-agnostic table model handed to downstream consumers.
//!
//! Field names serialize in camelCase (`subType`, `primaryKey`) and optional
//! attributes are omitted entirely when they do not apply.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic classification of a native column type.
///
/// Tokens missing from an engine's lookup table pass through verbatim as
/// [`SemanticType::Other`] (lowercased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SemanticType {
    String,
    Date,
    Int,
    Float,
    Boolean,
    /// Single-bit numeric collapsed from `tinyint(1)` / `bit(1)`
    Bool,
    Other(String),
}

impl SemanticType {
    pub fn as_str(&self) -> &str {
        match self {
            SemanticType::String => "string",
            SemanticType::Date => "date",
            SemanticType::Int => "int",
            SemanticType::Float => "float",
            SemanticType::Boolean => "boolean",
            SemanticType::Bool => "bool",
            SemanticType::Other(token) => token,
        }
    }

    /// Whether `unsigned` is meaningful for this type.
    pub fn is_numeric(&self) -> bool {
        matches!(self, SemanticType::Int | SemanticType::Float)
    }
}

impl From<String> for SemanticType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "string" => SemanticType::String,
            "date" => SemanticType::Date,
            "int" => SemanticType::Int,
            "float" => SemanticType::Float,
            "boolean" => SemanticType::Boolean,
            "bool" => SemanticType::Bool,
            _ => SemanticType::Other(value),
        }
    }
}

impl From<SemanticType> for String {
    fn from(value: SemanticType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refinement of [`SemanticType::Date`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubType {
    Datetime,
    Date,
    Year,
    Time,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub comment: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<SubType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsigned: Option<bool>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoincrement: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Unique,
    Index,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    #[serde(rename = "type")]
    pub index_type: IndexType,
    pub index: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationType {
    BelongsTo,
    HasMany,
}

/// Table a relation points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub database: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    /// Local columns
    pub columns: Vec<String>,
    /// Columns on the related table, positionally paired with `columns`
    pub references: Vec<String>,
    pub on: TableRef,
}

impl Relation {
    /// The `has-many` seen from the other side of this `belongs-to`, pointing back at `from`.
    pub fn reciprocal(&self, from: TableRef) -> Relation {
        Relation {
            relation_type: RelationType::HasMany,
            columns: self.references.clone(),
            references: self.columns.clone(),
            on: from,
        }
    }
}

/// Normalized descriptor of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub table: String,
    pub schema: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub relations: Vec<Relation>,
    pub primary_key: PrimaryKey,
}

impl Item {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

pub type Items = Vec<Item>;
