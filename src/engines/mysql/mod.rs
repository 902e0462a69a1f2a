// MySQL engine: type classifier, column normalizer, relation resolver and scanner

pub mod column;
pub mod ddl;
pub mod relations;
pub mod scanner;

#[cfg(test)]
mod scanner_tests;

pub use column::{MySqlColumn, MySqlColumnNormalizer, MySqlTypeClassifier};
pub use relations::MySqlRelationResolver;
pub use scanner::{MySqlScanner, DEFAULT_CONCURRENCY};
