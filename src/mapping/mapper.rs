//! Embedded-value mapper
//!
//! Pure functions between nested instances (JSON object graphs) and flat
//! rows keyed by physical column name. Neither direction touches storage.
//!
//! `materialize(flatten(e)) == e` holds with two caveats:
//! - `real` leaves accept only JSON floats, so `60` must be written `60.0`
//! - a nullable embedding whose leaves are all nullable cannot tell "absent"
//!   from "present with every leaf null"; `{"o": {"note": null}}` reads back
//!   as `{"o": null}`

use crate::mapping::metadata::{EntityMetadata, FieldNode};
use crate::value::{json_kind_name, Row, Value};
use crate::{Error, Result};
use serde_json::{Map, Value as Json};

/// Flatten an entity instance into a row.
///
/// A missing or `null` nullable embedded field writes `NULL` into every
/// column it owns.
pub fn flatten(meta: &EntityMetadata, instance: &Json) -> Result<Row> {
    let object = expect_object(instance, meta.name())?;
    let mut row = Row::new();
    flatten_fields(meta.fields(), object, meta.name(), &mut row)?;
    Ok(row)
}

fn flatten_fields(fields: &[FieldNode], object: &Map<String, Json>, owner: &str, row: &mut Row) -> Result<()> {
    if let Some(unknown) = object.keys().find(|key| !fields.iter().any(|f| f.name() == key.as_str())) {
        return Err(Error::UnknownField {
            path: owner.to_string(),
            field: unknown.clone(),
        });
    }

    for field in fields {
        let value = object.get(field.name()).filter(|v| !v.is_null());

        match (field, value) {
            (FieldNode::Scalar(leaf), Some(json)) => {
                row.insert(leaf.column.clone(), Value::from_json(json, leaf.scalar_type, &leaf.path)?);
            }
            (FieldNode::Scalar(leaf), None) => {
                if !leaf.nullable {
                    return Err(Error::MissingField(leaf.path.clone()));
                }
                row.insert(leaf.column.clone(), Value::Null);
            }
            (FieldNode::Embedded(node), Some(json)) => {
                let nested = expect_object(json, &node.path)?;
                flatten_fields(&node.fields, nested, &node.path, row)?;
            }
            (FieldNode::Embedded(node), None) => {
                if !node.nullable {
                    return Err(Error::MissingField(node.path.clone()));
                }
                for leaf in node.leaves() {
                    row.insert(leaf.column.clone(), Value::Null);
                }
            }
        }
    }
    Ok(())
}

fn expect_object<'a>(json: &'a Json, path: &str) -> Result<&'a Map<String, Json>> {
    json.as_object().ok_or_else(|| Error::TypeMismatch {
        path: path.to_string(),
        expected: "object".to_string(),
        found: json_kind_name(json).to_string(),
    })
}

/// Rebuild the nested instance from a row.
///
/// A nullable embedded field whose columns are all absent or `NULL` reads
/// as `null`. Once an embedded object is present, each of its non-nullable
/// leaves must be present too; otherwise the row is rejected as
/// [`Error::InconsistentPartialRow`].
pub fn materialize(meta: &EntityMetadata, row: &Row) -> Result<Json> {
    let object = materialize_fields(meta.fields(), row, None)?;
    Ok(Json::Object(object))
}

fn materialize_fields(fields: &[FieldNode], row: &Row, optional_owner: Option<&str>) -> Result<Map<String, Json>> {
    let mut object = Map::new();

    for field in fields {
        match field {
            FieldNode::Scalar(leaf) => {
                let raw = row.get(&leaf.column).cloned().unwrap_or(Value::Null);
                let value = raw.coerce(leaf.scalar_type, &leaf.column)?;
                if value.is_null() && !leaf.nullable {
                    return Err(match optional_owner {
                        Some(path) => Error::InconsistentPartialRow {
                            path: path.to_string(),
                            column: leaf.column.clone(),
                        },
                        None => Error::NullViolation(leaf.column.clone()),
                    });
                }
                object.insert(leaf.name.clone(), value.to_json());
            }
            FieldNode::Embedded(node) => {
                if node.nullable && node.leaves().iter().all(|leaf| row.is_null(&leaf.column)) {
                    object.insert(node.name.clone(), Json::Null);
                    continue;
                }
                let owner = if node.nullable { Some(node.path.as_str()) } else { optional_owner };
                let nested = materialize_fields(&node.fields, row, owner)?;
                object.insert(node.name.clone(), Json::Object(nested));
            }
        }
    }

    Ok(object)
}

impl EntityMetadata {
    /// See [`flatten`]
    pub fn flatten(&self, instance: &Json) -> Result<Row> {
        flatten(self, instance)
    }

    /// See [`materialize`]
    pub fn materialize(&self, row: &Row) -> Result<Json> {
        materialize(self, row)
    }
}
