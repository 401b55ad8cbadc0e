//! Schema definitions - the declarative input format
//!
//! Entities and embeddables are described as plain data, either through
//! the builder methods below or as a TOML document:
//!
//! ```toml
//! [[embeddables]]
//! name = "PersonName"
//! fields = [
//!     { name = "givenName", type = "string" },
//!     { name = "surname", type = "string" },
//! ]
//!
//! [[entities]]
//! name = "Patient"
//! fields = [
//!     { name = "id", type = "text", primary = true },
//!     { name = "name", embedded = "PersonName", prefix = false },
//! ]
//! ```
//!
//! Definitions are only descriptions. They are resolved and validated by
//! [`crate::mapping::SchemaRegistry`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Scalar column types supported by the mapper.
///
/// Parsed case-insensitively through [`FromStr`], aliases included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ScalarType {
    Text,
    Integer,
    Real,
    Boolean,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Text => "text",
            ScalarType::Integer => "integer",
            ScalarType::Real => "real",
            ScalarType::Boolean => "boolean",
        }
    }

    /// SQLite storage type for columns of this scalar type
    pub fn sql_type(&self) -> &'static str {
        match self {
            ScalarType::Text => "TEXT",
            ScalarType::Integer | ScalarType::Boolean => "INTEGER",
            ScalarType::Real => "REAL",
        }
    }
}

impl FromStr for ScalarType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "string" => Ok(ScalarType::Text),
            "integer" | "int" | "number" => Ok(ScalarType::Integer),
            "real" | "float" | "double" => Ok(ScalarType::Real),
            "boolean" | "bool" => Ok(ScalarType::Boolean),
            _ => Err(Error::UnknownScalarType(s.to_string())),
        }
    }
}

impl TryFrom<String> for ScalarType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How an embedding contributes to the physical column names of its fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PrefixRule {
    /// `prefix = false`: fields map 1:1 onto the parent's columns.
    None,
    /// `prefix = "text"`: every descendant column starts with exactly this
    /// text. Replaces the accumulated ancestor prefix instead of extending it.
    Explicit(String),
    /// `prefix = true` or omitted: the embeddable's own default prefix
    /// (or `<fieldName>_`), appended to the ancestor prefix.
    #[default]
    Inherit,
}

impl PrefixRule {
    pub fn explicit(prefix: impl Into<String>) -> Self {
        PrefixRule::Explicit(prefix.into())
    }
}

impl Serialize for PrefixRule {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            PrefixRule::None => serializer.serialize_bool(false),
            PrefixRule::Inherit => serializer.serialize_bool(true),
            PrefixRule::Explicit(prefix) => serializer.serialize_str(prefix),
        }
    }
}

impl<'de> Deserialize<'de> for PrefixRule {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawPrefix {
            Flag(bool),
            Text(String),
        }

        Ok(match RawPrefix::deserialize(deserializer)? {
            RawPrefix::Flag(false) => PrefixRule::None,
            RawPrefix::Flag(true) => PrefixRule::Inherit,
            RawPrefix::Text(prefix) => PrefixRule::Explicit(prefix),
        })
    }
}

/// A scalar field: one physical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalarFieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub scalar_type: ScalarType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

impl ScalarFieldDef {
    /// Mark as the entity's primary (identifier) field
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// An embedded field: inlines the fields of the named embeddable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddedFieldDef {
    pub name: String,
    /// Name of the embeddable being inlined
    pub embedded: String,
    #[serde(default)]
    pub prefix: PrefixRule,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

impl EmbeddedFieldDef {
    pub fn prefix(mut self, rule: PrefixRule) -> Self {
        self.prefix = rule;
        self
    }

    /// Shorthand for `prefix(PrefixRule::None)`
    pub fn no_prefix(self) -> Self {
        self.prefix(PrefixRule::None)
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A field of an entity or embeddable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldDef {
    Scalar(ScalarFieldDef),
    Embedded(EmbeddedFieldDef),
}

impl FieldDef {
    pub fn scalar(name: impl Into<String>, scalar_type: ScalarType) -> ScalarFieldDef {
        ScalarFieldDef {
            name: name.into(),
            scalar_type,
            primary: false,
            nullable: false,
        }
    }

    pub fn embedded(name: impl Into<String>, embeddable: impl Into<String>) -> EmbeddedFieldDef {
        EmbeddedFieldDef {
            name: name.into(),
            embedded: embeddable.into(),
            prefix: PrefixRule::Inherit,
            nullable: false,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldDef::Scalar(f) => &f.name,
            FieldDef::Embedded(f) => &f.name,
        }
    }

}

impl From<ScalarFieldDef> for FieldDef {
    fn from(field: ScalarFieldDef) -> Self {
        FieldDef::Scalar(field)
    }
}

impl From<EmbeddedFieldDef> for FieldDef {
    fn from(field: EmbeddedFieldDef) -> Self {
        FieldDef::Embedded(field)
    }
}

/// An identity-less value object whose fields are inlined into its embedder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddableDef {
    pub name: String,
    /// Prefix applied when embedded with [`PrefixRule::Inherit`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl EmbeddableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            fields: Vec::new(),
        }
    }

    pub fn with_default_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn field(mut self, field: impl Into<FieldDef>) -> Self {
        self.fields.push(field.into());
        self
    }
}

/// A top-level record stored in its own table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDef {
    pub name: String,
    /// Table name; defaults to the snake_case entity name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: impl Into<FieldDef>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// The table name this entity is stored in
    pub fn table_name(&self) -> String {
        self.table.clone().unwrap_or_else(|| snake_case(&self.name))
    }
}

/// A complete schema document as read from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default)]
    pub embeddables: Vec<EmbeddableDef>,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
}

impl SchemaDocument {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// `EmergencyContact` -> `emergency_contact`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}
