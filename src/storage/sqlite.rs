//! SQLite storage implementation

use std::path::Path;
use rusqlite::{Connection, params_from_iter};
use crate::Result;
use crate::mapping::EntityMetadata;
use crate::value::{Row, Value};
use super::schema;

/// Which parts of each executed statement get logged at `debug` level
/// under the `embedmap::query` target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryLogging {
    pub query: bool,
    pub params: bool,
}

/// SQLite-backed storage for flat entity rows
pub struct SqliteStore {
    conn: Connection,
    logging: QueryLogging,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn, logging: QueryLogging::default() })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, logging: QueryLogging::default() })
    }

    pub fn with_logging(mut self, logging: QueryLogging) -> Self {
        self.logging = logging;
        self
    }

    fn log_statement(&self, sql: &str, params: &[Value]) {
        if !self.logging.query {
            return;
        }
        if self.logging.params && !params.is_empty() {
            let rendered: Vec<String> = params.iter().map(|p| p.to_string()).collect();
            tracing::debug!(target: "embedmap::query", "{} [{}]", sql, rendered.join(", "));
        } else {
            tracing::debug!(target: "embedmap::query", "{}", sql);
        }
    }

    // ========== Schema Operations ==========

    /// Create the entity's table if it does not exist
    pub fn create_table(&self, meta: &EntityMetadata) -> Result<()> {
        let sql = schema::create_table_sql(meta);
        self.log_statement(&sql, &[]);
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    /// Drop the entity's table if it exists
    pub fn drop_table(&self, meta: &EntityMetadata) -> Result<()> {
        let sql = schema::drop_table_sql(meta);
        self.log_statement(&sql, &[]);
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    /// Names of all user tables, sorted
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
        )?;

        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(names)
    }

    /// Physical column names of a table, in table order
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM pragma_table_info(?1) ORDER BY cid"
        )?;

        let columns = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(columns)
    }

    // ========== Row Operations ==========

    /// Insert one flat row; columns missing from `row` are written as NULL
    pub fn insert_row(&self, meta: &EntityMetadata, row: &Row) -> Result<()> {
        let sql = schema::insert_sql(meta);
        let values: Vec<Value> = meta
            .columns()
            .iter()
            .map(|c| row.get(&c.name).cloned().unwrap_or(Value::Null))
            .collect();

        self.log_statement(&sql, &values);
        self.conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(())
    }

    /// Select rows matching every `(column, value)` condition; a `NULL`
    /// value matches NULL columns
    pub fn select_where(
        &self,
        meta: &EntityMetadata,
        conditions: &[(&str, Value)],
        limit: Option<usize>,
    ) -> Result<Vec<Row>> {
        let values = schema::bound_values(conditions);
        let sql = schema::select_sql(meta, conditions, limit);

        self.log_statement(&sql, &values);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| self.row_to_row(meta, row))?
            .collect::<rusqlite::Result<Vec<Row>>>()?;

        Ok(rows)
    }

    /// Delete rows matching every condition, returning how many were removed
    pub fn delete_where(&self, meta: &EntityMetadata, conditions: &[(&str, Value)]) -> Result<usize> {
        let values = schema::bound_values(conditions);
        let sql = schema::delete_sql(meta, conditions);

        self.log_statement(&sql, &values);
        let removed = self.conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(removed)
    }

    /// Count an entity's rows
    pub fn count(&self, meta: &EntityMetadata) -> Result<usize> {
        let sql = schema::count_sql(meta);
        self.log_statement(&sql, &[]);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Helper to convert a SQLite row to a flat row keyed by physical column
    fn row_to_row(&self, meta: &EntityMetadata, row: &rusqlite::Row) -> rusqlite::Result<Row> {
        let mut out = Row::new();
        for (i, column) in meta.columns().iter().enumerate() {
            let value: Value = row.get(i)?;
            out.insert(column.name.clone(), value);
        }
        Ok(out)
    }

    /// Close the connection, reporting any error instead of dropping it silently
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SchemaRegistry;
    use crate::schema::{EmbeddableDef, EntityDef, FieldDef, ScalarType};
    use std::sync::Arc;

    fn book_metadata() -> Arc<EntityMetadata> {
        let catalog = SchemaRegistry::new()
            .embeddable(
                EmbeddableDef::new("Isbn")
                    .field(FieldDef::scalar("code", ScalarType::Text))
                    .field(FieldDef::scalar("checked", ScalarType::Boolean)),
            )
            .entity(
                EntityDef::new("Book")
                    .field(FieldDef::scalar("id", ScalarType::Text).primary())
                    .field(FieldDef::scalar("pages", ScalarType::Integer))
                    .field(FieldDef::embedded("isbn", "Isbn").nullable()),
            )
            .build()
            .unwrap();
        catalog.get("Book").unwrap().clone()
    }

    fn sample_row(id: &str, pages: i64) -> Row {
        Row::new()
            .with("id", id)
            .with("pages", pages)
            .with("isbn_code", "978-0")
            .with("isbn_checked", true)
    }

    #[test]
    fn test_create_table_columns() {
        let store = SqliteStore::open_in_memory().unwrap();
        let meta = book_metadata();

        store.create_table(&meta).unwrap();

        assert_eq!(store.table_names().unwrap(), vec!["book"]);
        assert_eq!(
            store.table_columns("book").unwrap(),
            vec!["id", "pages", "isbn_code", "isbn_checked"]
        );
    }

    #[test]
    fn test_row_crud() {
        let store = SqliteStore::open_in_memory().unwrap();
        let meta = book_metadata();
        store.create_table(&meta).unwrap();

        store.insert_row(&meta, &sample_row("b1", 120)).unwrap();
        store.insert_row(&meta, &sample_row("b2", 300)).unwrap();
        assert_eq!(store.count(&meta).unwrap(), 2);

        let rows = store.select_where(&meta, &[("id", Value::from("b1"))], None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("pages"), Some(&Value::Integer(120)));
        // Booleans come back as their INTEGER storage class
        assert_eq!(rows[0].get("isbn_checked"), Some(&Value::Integer(1)));

        let removed = store.delete_where(&meta, &[("id", Value::from("b1"))]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count(&meta).unwrap(), 1);
    }

    #[test]
    fn test_missing_columns_written_as_null() {
        let store = SqliteStore::open_in_memory().unwrap();
        let meta = book_metadata();
        store.create_table(&meta).unwrap();

        store.insert_row(&meta, &Row::new().with("id", "b3").with("pages", 10i64)).unwrap();

        let rows = store.select_where(&meta, &[], Some(10)).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_null("isbn_code"));
        assert!(rows[0].is_null("isbn_checked"));
    }

    #[test]
    fn test_not_null_enforced() {
        let store = SqliteStore::open_in_memory().unwrap();
        let meta = book_metadata();
        store.create_table(&meta).unwrap();

        let result = store.insert_row(&meta, &Row::new().with("id", "b4"));
        assert!(result.is_err());
    }

    #[test]
    fn test_drop_and_close() {
        let store = SqliteStore::open_in_memory().unwrap().with_logging(QueryLogging { query: true, params: true });
        let meta = book_metadata();
        store.create_table(&meta).unwrap();
        store.drop_table(&meta).unwrap();
        assert!(store.table_names().unwrap().is_empty());
        store.close().unwrap();
    }
}
