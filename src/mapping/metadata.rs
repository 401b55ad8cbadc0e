//! Resolved entity metadata
//!
//! After resolution every scalar leaf knows its physical column, so the
//! mapper never recomputes prefixes. The tree is immutable and shared
//! through `Arc` across any number of mapping calls.

use crate::schema::ScalarType;
use crate::{Error, Result};
use std::collections::HashMap;

/// A scalar leaf of the resolved field tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarNode {
    /// Logical field name within its owner
    pub name: String,
    /// Dotted logical path from the entity root (e.g. `emergencyContact.name.surname`)
    pub path: String,
    /// Physical column name after prefix resolution
    pub column: String,
    pub scalar_type: ScalarType,
    pub nullable: bool,
    pub primary: bool,
}

/// An embedded value object with its inlined fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedNode {
    pub name: String,
    pub path: String,
    /// Name of the embeddable definition
    pub embeddable: String,
    /// Effective prefix applied to this node's direct scalar fields
    pub prefix: String,
    pub nullable: bool,
    pub fields: Vec<FieldNode>,
}

impl EmbeddedNode {
    /// Every scalar leaf below this node, depth-first
    pub fn leaves(&self) -> Vec<&ScalarNode> {
        let mut out = Vec::new();
        collect_leaves(&self.fields, &mut out);
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldNode {
    Scalar(ScalarNode),
    Embedded(EmbeddedNode),
}

impl FieldNode {
    pub fn name(&self) -> &str {
        match self {
            FieldNode::Scalar(s) => &s.name,
            FieldNode::Embedded(e) => &e.name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            FieldNode::Scalar(s) => &s.path,
            FieldNode::Embedded(e) => &e.path,
        }
    }
}

fn collect_leaves<'a>(fields: &'a [FieldNode], out: &mut Vec<&'a ScalarNode>) {
    for field in fields {
        match field {
            FieldNode::Scalar(s) => out.push(s),
            FieldNode::Embedded(e) => collect_leaves(&e.fields, out),
        }
    }
}

fn collect_embeddings<'a>(fields: &'a [FieldNode], out: &mut Vec<&'a EmbeddedNode>) {
    for field in fields {
        if let FieldNode::Embedded(e) = field {
            out.push(e);
            collect_embeddings(&e.fields, out);
        }
    }
}

/// A flattened `(name, type)` column as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalColumn {
    pub name: String,
    pub scalar_type: ScalarType,
    /// Logical path of the leaf this column came from
    pub path: String,
    pub primary: bool,
    /// Storage nullability: the leaf or any enclosing embedding is nullable
    pub nullable: bool,
}

/// Walk the resolved tree depth-first and emit one column per scalar leaf.
///
/// Fails with [`Error::SchemaConflict`] when two leaves share a column name.
/// SQLite identifiers are case-insensitive, so `Code` and `code` collide.
pub fn compute_physical_columns(entity: &str, fields: &[FieldNode]) -> Result<Vec<PhysicalColumn>> {
    let mut columns = Vec::new();
    let mut seen: HashMap<String, String> = HashMap::new();
    walk_columns(entity, fields, false, &mut columns, &mut seen)?;
    Ok(columns)
}

fn walk_columns(
    entity: &str,
    fields: &[FieldNode],
    ancestor_nullable: bool,
    columns: &mut Vec<PhysicalColumn>,
    seen: &mut HashMap<String, String>,
) -> Result<()> {
    for field in fields {
        match field {
            FieldNode::Scalar(leaf) => {
                if let Some(first) = seen.insert(leaf.column.to_ascii_lowercase(), leaf.path.clone()) {
                    return Err(Error::SchemaConflict {
                        entity: entity.to_string(),
                        column: leaf.column.clone(),
                        first,
                        second: leaf.path.clone(),
                    });
                }
                columns.push(PhysicalColumn {
                    name: leaf.column.clone(),
                    scalar_type: leaf.scalar_type,
                    path: leaf.path.clone(),
                    primary: leaf.primary,
                    nullable: ancestor_nullable || leaf.nullable,
                });
            }
            FieldNode::Embedded(node) => {
                walk_columns(entity, &node.fields, ancestor_nullable || node.nullable, columns, seen)?;
            }
        }
    }
    Ok(())
}

/// Immutable, validated mapping metadata for one entity.
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    name: String,
    table: String,
    fields: Vec<FieldNode>,
    columns: Vec<PhysicalColumn>,
    primary_key: usize,
}

impl EntityMetadata {
    /// Build metadata from a resolved field tree.
    ///
    /// Computes the physical columns and checks the identifier contract:
    /// exactly one primary field, a non-nullable top-level text scalar.
    pub fn new(name: impl Into<String>, table: impl Into<String>, fields: Vec<FieldNode>) -> Result<Self> {
        let name = name.into();
        let columns = compute_physical_columns(&name, &fields)?;

        let primaries: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary)
            .map(|(i, _)| i)
            .collect();

        let primary_key = match primaries.as_slice() {
            [] => return Err(Error::MissingPrimaryKey(name)),
            [single] => *single,
            many => {
                return Err(Error::MultiplePrimaryKeys {
                    entity: name,
                    fields: many.iter().map(|&i| columns[i].path.clone()).collect(),
                });
            }
        };

        let pk = &columns[primary_key];
        let reason = if pk.path.contains('.') {
            Some("must be declared on the entity itself, not inside an embeddable")
        } else if pk.scalar_type != ScalarType::Text {
            Some("must be of type text")
        } else if pk.nullable {
            Some("must not be nullable")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(Error::InvalidPrimaryKey {
                entity: name,
                field: pk.path.clone(),
                reason: reason.to_string(),
            });
        }

        Ok(Self {
            name,
            table: table.into(),
            fields,
            columns,
            primary_key,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Top-level fields of the resolved tree
    pub fn fields(&self) -> &[FieldNode] {
        &self.fields
    }

    /// Physical columns in declaration (depth-first) order
    pub fn columns(&self) -> &[PhysicalColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn primary_key(&self) -> &PhysicalColumn {
        &self.columns[self.primary_key]
    }

    /// Resolve a dotted logical path to its physical column
    pub fn column_for_path(&self, path: &str) -> Option<&PhysicalColumn> {
        self.columns.iter().find(|c| c.path == path)
    }

    /// Every embedded node of the tree, depth-first
    pub fn embeddings(&self) -> Vec<&EmbeddedNode> {
        let mut out = Vec::new();
        collect_embeddings(&self.fields, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(path: &str, column: &str, primary: bool) -> FieldNode {
        FieldNode::Scalar(ScalarNode {
            name: path.rsplit('.').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            column: column.to_string(),
            scalar_type: ScalarType::Text,
            nullable: false,
            primary,
        })
    }

    #[test]
    fn test_columns_inherit_ancestor_nullability() {
        let fields = vec![
            leaf("id", "id", true),
            FieldNode::Embedded(EmbeddedNode {
                name: "contact".into(),
                path: "contact".into(),
                embeddable: "Contact".into(),
                prefix: "contact_".into(),
                nullable: true,
                fields: vec![leaf("contact.phone", "contact_phone", false)],
            }),
        ];

        let meta = EntityMetadata::new("Person", "person", fields).unwrap();
        assert_eq!(meta.column_names(), vec!["id", "contact_phone"]);
        assert!(!meta.columns()[0].nullable);
        assert!(meta.columns()[1].nullable);
        assert_eq!(meta.primary_key().name, "id");
        assert_eq!(meta.column_for_path("contact.phone").unwrap().name, "contact_phone");

        let embeddings = meta.embeddings();
        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].embeddable, "Contact");
        assert_eq!(embeddings[0].prefix, "contact_");
    }

    #[test]
    fn test_conflicting_columns() {
        let fields = vec![leaf("id", "id", true), leaf("a.code", "code", false), leaf("b.code", "code", false)];
        let err = compute_physical_columns("Thing", &fields).unwrap_err();
        match err {
            Error::SchemaConflict { column, first, second, .. } => {
                assert_eq!(column, "code");
                assert_eq!(first, "a.code");
                assert_eq!(second, "b.code");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_columns_differing_only_in_case_conflict() {
        let fields = vec![leaf("id", "id", true), leaf("Code", "Code", false), leaf("c.code", "code", false)];
        let err = compute_physical_columns("Thing", &fields).unwrap_err();
        assert!(matches!(err, Error::SchemaConflict { ref column, ref first, .. } if column == "code" && first == "Code"));
    }

    #[test]
    fn test_primary_key_required() {
        let err = EntityMetadata::new("Thing", "thing", vec![leaf("code", "code", false)]).unwrap_err();
        assert!(matches!(err, Error::MissingPrimaryKey(_)));

        let err = EntityMetadata::new("Thing", "thing", vec![leaf("a", "a", true), leaf("b", "b", true)]).unwrap_err();
        assert!(matches!(err, Error::MultiplePrimaryKeys { ref fields, .. } if fields.len() == 2));
    }
}
