use crate::mapping::EntityMetadata;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct ColumnRow {
    #[tabled(rename = "Column")]
    pub column: String,
    #[tabled(rename = "Type")]
    pub scalar_type: String,
    #[tabled(rename = "Path")]
    pub path: String,
    #[tabled(rename = "Null")]
    pub nullable: String,
    #[tabled(rename = "Key")]
    pub key: String,
}

/// Render an entity's physical columns as a table
pub fn columns_table(meta: &EntityMetadata) -> String {
    let rows: Vec<ColumnRow> = meta
        .columns()
        .iter()
        .map(|c| ColumnRow {
            column: c.name.clone(),
            scalar_type: c.scalar_type.as_str().to_string(),
            path: c.path.clone(),
            nullable: if c.nullable { "yes" } else { "no" }.to_string(),
            key: if c.primary { "PK" } else { "" }.to_string(),
        })
        .collect();

    if rows.is_empty() {
        return String::new();
    }

    Table::new(&rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
pub struct EmbeddingRow {
    #[tabled(rename = "Field")]
    pub path: String,
    #[tabled(rename = "Embeddable")]
    pub embeddable: String,
    #[tabled(rename = "Prefix")]
    pub prefix: String,
    #[tabled(rename = "Null")]
    pub nullable: String,
}

/// Render the embedded fields of an entity with their effective prefixes
pub fn embeddings_table(meta: &EntityMetadata) -> String {
    let rows: Vec<EmbeddingRow> = meta
        .embeddings()
        .into_iter()
        .map(|e| EmbeddingRow {
            path: e.path.clone(),
            embeddable: e.embeddable.clone(),
            prefix: if e.prefix.is_empty() { "(none)".to_string() } else { e.prefix.clone() },
            nullable: if e.nullable { "yes" } else { "no" }.to_string(),
        })
        .collect();

    if rows.is_empty() {
        return String::new();
    }

    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SchemaRegistry;

    const SCHEMA: &str = include_str!("../../schemas/patient.toml");

    #[test]
    fn test_tables_list_columns_and_embeddings() {
        let catalog = SchemaRegistry::from_toml_str(SCHEMA).unwrap().build().unwrap();
        let patient = catalog.get("Patient").unwrap();

        let columns = columns_table(patient);
        assert!(columns.contains("emergency_contact_relationship"));
        assert!(columns.contains("PK"));

        let embeddings = embeddings_table(patient);
        assert!(embeddings.contains("EmergencyContact"));
        assert!(embeddings.contains("emergencyContact.name"));
        assert!(embeddings.contains("(none)"));
    }
}
