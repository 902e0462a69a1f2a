use serde::Serialize;
use std::collections::HashMap;

use crate::engines::model::{SemanticType, SubType};

/// Immutable base-token lookup supplied by each engine dialect.
///
/// Holds two mappings, base token → semantic type and base token → subtype,
/// both keyed by lowercased base tokens.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: HashMap<&'static str, SemanticType>,
    sub_types: HashMap<&'static str, SubType>,
}

impl TypeTable {
    /// Build a table from grouped mappings. A token listed twice keeps its last group.
    pub fn from_mappings(
        types: &[(SemanticType, &[&'static str])],
        sub_types: &[(SubType, &[&'static str])],
    ) -> Self {
        let mut table = TypeTable::default();
        for (semantic, tokens) in types {
            for token in tokens.iter() {
                table.types.insert(*token, semantic.clone());
            }
        }
        for (sub_type, tokens) in sub_types {
            for token in tokens.iter() {
                table.sub_types.insert(*token, *sub_type);
            }
        }
        table
    }

    /// Semantic type for a lowercased base token; unknown tokens pass through.
    pub fn semantic_type(&self, base: &str) -> SemanticType {
        self.types
            .get(base)
            .cloned()
            .unwrap_or_else(|| SemanticType::Other(base.to_string()))
    }

    pub fn sub_type(&self, base: &str) -> Option<SubType> {
        self.sub_types.get(base).copied()
    }
}

/// Result of classifying one native type token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfo {
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<SubType>,
    /// Only set for int/float
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsigned: Option<bool>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
}

impl TypeInfo {
    pub(crate) fn new(semantic_type: SemanticType, sub_type: Option<SubType>) -> Self {
        Self {
            semantic_type,
            sub_type,
            unsigned: None,
            enum_values: None,
            size: None,
            scale: None,
        }
    }
}
