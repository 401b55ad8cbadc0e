//! SQL statement generation from entity metadata

use crate::mapping::EntityMetadata;
use crate::value::Value;

/// Quote an identifier for SQLite, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL to create an entity's table
pub fn create_table_sql(meta: &EntityMetadata) -> String {
    let mut defs: Vec<String> = meta
        .columns()
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quote_identifier(&c.name), c.scalar_type.sql_type());
            if !c.nullable {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();
    defs.push(format!("PRIMARY KEY ({})", quote_identifier(&meta.primary_key().name)));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote_identifier(meta.table()),
        defs.join(",\n    ")
    )
}

/// SQL to drop an entity's table
pub fn drop_table_sql(meta: &EntityMetadata) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(meta.table()))
}

/// SQL to insert one row, with parameters in column order
pub fn insert_sql(meta: &EntityMetadata) -> String {
    let columns: Vec<String> = meta.columns().iter().map(|c| quote_identifier(&c.name)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(meta.table()),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// `NULL` conditions become `IS NULL` and take no parameter; the rest bind
/// `?N` in order.
fn where_clause(conditions: &[(&str, Value)]) -> String {
    if conditions.is_empty() {
        return String::new();
    }
    let mut index = 0;
    let parts: Vec<String> = conditions
        .iter()
        .map(|(column, value)| {
            if value.is_null() {
                format!("{} IS NULL", quote_identifier(column))
            } else {
                index += 1;
                format!("{} = ?{}", quote_identifier(column), index)
            }
        })
        .collect();
    format!(" WHERE {}", parts.join(" AND "))
}

/// Values to bind for `conditions`, matching the placeholders of [`where_clause`]
pub fn bound_values(conditions: &[(&str, Value)]) -> Vec<Value> {
    conditions
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(_, value)| value.clone())
        .collect()
}

/// SQL to select every physical column, filtered by equality on `conditions`
pub fn select_sql(meta: &EntityMetadata, conditions: &[(&str, Value)], limit: Option<usize>) -> String {
    let columns: Vec<String> = meta.columns().iter().map(|c| quote_identifier(&c.name)).collect();
    let mut sql = format!(
        "SELECT {} FROM {}{}",
        columns.join(", "),
        quote_identifier(meta.table()),
        where_clause(conditions)
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}

/// SQL to delete rows filtered by equality on `conditions`
pub fn delete_sql(meta: &EntityMetadata, conditions: &[(&str, Value)]) -> String {
    format!("DELETE FROM {}{}", quote_identifier(meta.table()), where_clause(conditions))
}

/// SQL to count an entity's rows
pub fn count_sql(meta: &EntityMetadata) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_identifier(meta.table()))
}
