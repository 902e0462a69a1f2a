use once_cell::sync::Lazy;
use regex::Regex;

use crate::database::{DatabaseResult, DatabaseRow};
use crate::engines::model::{Column, SemanticType, SubType};
use crate::engines::types::{TypeInfo, TypeTable};
use crate::engines::ColumnNormalizer;
use crate::error::{Error, Result};

const STRING_TYPES: &[&str] = &[
    "varchar",
    "text",
    "string",
    "char",
    "enum",
    "tinytext",
    "mediumtext",
    "longtext",
];
const DATE_TYPES: &[&str] = &["datetime", "year", "date", "time", "timestamp"];
const INT_TYPES: &[&str] = &["bigint", "int", "integer", "tinyint", "smallint", "mediumint"];
const FLOAT_TYPES: &[&str] = &[
    "float",
    "decimal",
    "numeric",
    "dec",
    "fixed",
    "double",
    "real",
    "double precision",
];
const BOOLEAN_TYPES: &[&str] = &["longblob", "blob", "bit"];

/// Base tokens that collapse to `bool` when declared with a size of 1
const SINGLE_BIT_TYPES: &[&str] = &["bit", "tinyint"];

static MYSQL_TYPES: Lazy<TypeTable> = Lazy::new(|| {
    TypeTable::from_mappings(
        &[
            (SemanticType::String, STRING_TYPES),
            (SemanticType::Date, DATE_TYPES),
            (SemanticType::Int, INT_TYPES),
            (SemanticType::Float, FLOAT_TYPES),
            (SemanticType::Boolean, BOOLEAN_TYPES),
        ],
        &[
            (SubType::Datetime, &["datetime", "timestamp"][..]),
            (SubType::Date, &["date"][..]),
            (SubType::Year, &["year"][..]),
            (SubType::Time, &["time"][..]),
        ],
    )
});

static TYPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)(?:\(([^)]+)\)?)?").expect("type pattern is valid"));

/// Parses the leading integer of `s` the way the server's own tools do,
/// ignoring surrounding whitespace and trailing garbage.
fn leading_int(s: &str) -> Option<u32> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok()
}

/// Classifies MySQL column type tokens such as `bigint(20) unsigned`.
#[derive(Debug, Clone, Copy)]
pub struct MySqlTypeClassifier {
    table: &'static TypeTable,
}

impl Default for MySqlTypeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlTypeClassifier {
    pub fn new() -> Self {
        Self {
            table: &MYSQL_TYPES,
        }
    }

    /// Classify a type token; `None` when it does not start with an identifier.
    pub fn classify(&self, token: &str) -> Option<TypeInfo> {
        let captures = TYPE_PATTERN.captures(token)?;
        let base = captures[1].to_lowercase();

        let mut info = TypeInfo::new(self.table.semantic_type(&base), self.table.sub_type(&base));
        if let Some(precision) = captures.get(2) {
            apply_precision(&base, precision.as_str(), &mut info);
        }

        // Matches anywhere in the token, not only in modifier position.
        if info.semantic_type.is_numeric() {
            info.unsigned = Some(token.contains("unsigned"));
        }

        Some(info)
    }
}

fn apply_precision(base: &str, precision: &str, info: &mut TypeInfo) {
    let parts: Vec<String> = precision
        .split(',')
        .map(|part| part.trim().replace('\'', ""))
        .collect();

    if base == "enum" {
        info.enum_values = Some(parts);
        return;
    }

    let size = parts.first().and_then(|p| leading_int(p));
    if size == Some(1) && SINGLE_BIT_TYPES.contains(&base) {
        info.semantic_type = SemanticType::Bool;
        return;
    }

    info.size = size;
    if let Some(scale) = parts.get(1).filter(|p| !p.is_empty()) {
        info.scale = leading_int(scale);
    }
}

/// One row of `SHOW FULL COLUMNS`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MySqlColumn {
    pub field: String,
    pub column_type: String,
    pub null: String,
    pub default: Option<String>,
    pub extra: String,
    pub comment: String,
}

impl MySqlColumn {
    pub fn from_row(row: &dyn DatabaseRow) -> DatabaseResult<Self> {
        Ok(Self {
            field: row.get_string("Field")?,
            column_type: row.try_get_string("Type")?.unwrap_or_default(),
            null: row.try_get_string("Null")?.unwrap_or_default(),
            default: row.try_get_string("Default")?,
            extra: row.try_get_string("Extra")?.unwrap_or_default(),
            comment: row.try_get_string("Comment")?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlColumnNormalizer {
    classifier: MySqlTypeClassifier,
}

impl MySqlColumnNormalizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ColumnNormalizer for MySqlColumnNormalizer {
    type Raw = MySqlColumn;

    fn normalize(&self, raw: &MySqlColumn) -> Result<Column> {
        let token = if raw.column_type.is_empty() {
            "string"
        } else {
            raw.column_type.as_str()
        };
        let info = self
            .classifier
            .classify(token)
            .ok_or_else(|| Error::MalformedType {
                column: raw.field.clone(),
                token: token.to_string(),
            })?;

        Ok(Column {
            name: raw.field.clone(),
            nullable: raw.null == "YES",
            default: raw.default.clone(),
            comment: raw.comment.clone(),
            semantic_type: info.semantic_type,
            sub_type: info.sub_type,
            unsigned: info.unsigned,
            enum_values: info.enum_values,
            size: info.size,
            scale: info.scale,
            autoincrement: (raw.extra == "auto_increment").then_some(true),
        })
    }
}
