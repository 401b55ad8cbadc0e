//! # Embedmap - Embedded-Value Schema Mapping
//!
//! Declare entities and embeddable value objects once, then map nested
//! instances to flat, prefixed columns and back.
//!
//! Embedmap provides:
//! - Declarative schema definitions (Rust builders or TOML documents)
//! - Eagerly validated entity metadata with deterministic physical columns
//! - Pure flatten/materialize functions between instances and rows
//! - SQLite-backed storage driven by the computed columns
//! - An explicit mapping context with a create/close lifecycle

pub mod value;
pub mod schema;
pub mod mapping;
pub mod storage;
pub mod context;
pub mod query;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use value::{Row, Value};
pub use schema::{EmbeddableDef, EntityDef, FieldDef, PrefixRule, ScalarType, SchemaDocument};
pub use mapping::{EntityMetadata, PhysicalColumn, SchemaRegistry};
pub use storage::SqliteStore;
pub use context::{Entity, MappingContext};
pub use query::QueryBuilder;

/// Result type alias for Embedmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Embedmap operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Schema conflict in {entity}: column '{column}' produced by both '{first}' and '{second}'")]
    SchemaConflict {
        entity: String,
        column: String,
        first: String,
        second: String,
    },

    #[error("Inconsistent partial row for '{path}': column '{column}' is null while sibling columns are set")]
    InconsistentPartialRow { path: String, column: String },

    #[error("Null value for non-nullable column '{0}'")]
    NullViolation(String),

    #[error("Unknown embeddable '{embeddable}' referenced by '{path}'")]
    UnknownEmbeddable { embeddable: String, path: String },

    #[error("Cyclic embedding: {0}")]
    CyclicEmbedding(String),

    #[error("Entity '{0}' declares no primary field")]
    MissingPrimaryKey(String),

    #[error("Entity '{entity}' declares more than one primary field: {fields:?}")]
    MultiplePrimaryKeys { entity: String, fields: Vec<String> },

    #[error("Invalid primary field '{field}' on '{entity}': {reason}")]
    InvalidPrimaryKey {
        entity: String,
        field: String,
        reason: String,
    },

    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unknown scalar type '{0}'")]
    UnknownScalarType(String),

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Unknown field '{field}' in {path}")]
    UnknownField { path: String, field: String },

    #[error("Missing value for non-nullable field '{0}'")]
    MissingField(String),

    #[error("Unknown path '{path}' on entity '{entity}'")]
    UnknownPath { entity: String, path: String },

    #[error("Type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema parse error: {0}")]
    SchemaParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
