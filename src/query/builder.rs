//! Query builder implementation
//!
//! Conditions are written against logical dotted paths
//! (`emergencyContact.name.surname`) and resolved to physical columns
//! through the entity metadata before any SQL is produced.

use std::sync::Arc;
use crate::{Error, Result};
use crate::mapping::EntityMetadata;
use crate::storage::SqliteStore;
use crate::value::{Row, Value};

/// Select-all query over one entity
pub struct QueryBuilder<'a> {
    store: &'a SqliteStore,
    meta: Arc<EntityMetadata>,
    conditions: Vec<(String, Value)>,
    limit: Option<usize>,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(store: &'a SqliteStore, meta: Arc<EntityMetadata>) -> Self {
        Self {
            store,
            meta,
            conditions: Vec::new(),
            limit: None,
        }
    }

    /// Select every physical column. This is the only projection; it exists
    /// so call sites read as `select_all().where_eq(..)`.
    pub fn select_all(self) -> Self {
        self
    }

    /// Require the scalar at `path` to equal `value`
    pub fn where_eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((path.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn resolve_conditions(&self) -> Result<Vec<(&str, Value)>> {
        self.conditions
            .iter()
            .map(|(path, value)| {
                let column = self.meta.column_for_path(path).ok_or_else(|| Error::UnknownPath {
                    entity: self.meta.name().to_string(),
                    path: path.clone(),
                })?;
                Ok((column.name.as_str(), value.clone()))
            })
            .collect()
    }

    /// Execute and return the flat rows without materializing them
    pub fn rows(&self) -> Result<Vec<Row>> {
        let conditions = self.resolve_conditions()?;
        self.store.select_where(&self.meta, &conditions, self.limit)
    }

    /// Execute and materialize every matching row
    pub fn all(&self) -> Result<Vec<serde_json::Value>> {
        self.rows()?
            .iter()
            .map(|row| self.meta.materialize(row))
            .collect()
    }

    /// Execute and materialize the first matching row, if any
    pub fn get(&self) -> Result<Option<serde_json::Value>> {
        let conditions = self.resolve_conditions()?;
        let rows = self.store.select_where(&self.meta, &conditions, Some(1))?;
        rows.first().map(|row| self.meta.materialize(row)).transpose()
    }
}
