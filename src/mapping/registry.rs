//! Schema registry - resolves definitions into entity metadata
//!
//! Resolution is a depth-first walk carrying a prefix accumulator:
//! - `PrefixRule::None` leaves the accumulator unchanged
//! - `PrefixRule::Explicit(p)` resets it to exactly `p`
//! - `PrefixRule::Inherit` appends the embeddable's default prefix
//!   (or `<fieldName>_`)
//!
//! Every validation happens here, before any row is processed.

use crate::mapping::metadata::{EmbeddedNode, EntityMetadata, FieldNode, ScalarNode};
use crate::schema::{EmbeddableDef, EntityDef, FieldDef, PrefixRule, SchemaDocument};
use crate::{Error, Result};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, OnceLock};

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

fn is_identifier(name: &str) -> bool {
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"))
        .is_match(name)
}

fn check_identifier(kind: &str, name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(format!("{} '{}'", kind, name)))
    }
}

/// Collects entity and embeddable definitions prior to resolution.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    embeddables: Vec<EmbeddableDef>,
    entities: Vec<EntityDef>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: SchemaDocument) -> Self {
        Self {
            embeddables: doc.embeddables,
            entities: doc.entities,
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(Self::from_document(SchemaDocument::from_toml_str(contents)?))
    }

    pub fn embeddable(mut self, def: EmbeddableDef) -> Self {
        self.embeddables.push(def);
        self
    }

    pub fn entity(mut self, def: EntityDef) -> Self {
        self.entities.push(def);
        self
    }

    /// Resolve and validate every entity.
    pub fn build(&self) -> Result<Catalog> {
        let mut embeddables: HashMap<&str, &EmbeddableDef> = HashMap::new();
        for def in &self.embeddables {
            check_identifier("embeddable", &def.name)?;
            if embeddables.insert(def.name.as_str(), def).is_some() {
                return Err(Error::DuplicateDefinition(format!("embeddable '{}'", def.name)));
            }
        }

        let mut entities = BTreeMap::new();
        let mut tables = HashSet::new();
        for def in &self.entities {
            check_identifier("entity", &def.name)?;
            let table = def.table_name();
            check_identifier("table", &table)?;
            if entities.contains_key(&def.name) {
                return Err(Error::DuplicateDefinition(format!("entity '{}'", def.name)));
            }
            if !tables.insert(table.to_ascii_lowercase()) {
                return Err(Error::DuplicateDefinition(format!("table '{}'", table)));
            }

            let resolver = Resolver { embeddables: &embeddables };
            // Embeddables on the current path
            let mut stack = Vec::new();
            let fields = resolver.resolve_fields(&def.fields, "", "", &mut stack)?;
            let metadata = EntityMetadata::new(def.name.clone(), table, fields)?;

            tracing::debug!(
                entity = %metadata.name(),
                table = %metadata.table(),
                columns = ?metadata.column_names(),
                "Discovered entity"
            );
            entities.insert(def.name.clone(), Arc::new(metadata));
        }

        Ok(Catalog { entities })
    }
}

struct Resolver<'a> {
    embeddables: &'a HashMap<&'a str, &'a EmbeddableDef>,
}

impl Resolver<'_> {
    fn resolve_fields(
        &self,
        defs: &[FieldDef],
        owner_path: &str,
        prefix: &str,
        stack: &mut Vec<String>,
    ) -> Result<Vec<FieldNode>> {
        let mut names = HashSet::new();
        let mut nodes = Vec::with_capacity(defs.len());

        for def in defs {
            check_identifier("field", def.name())?;
            let path = if owner_path.is_empty() {
                def.name().to_string()
            } else {
                format!("{}.{}", owner_path, def.name())
            };
            if !names.insert(def.name()) {
                return Err(Error::DuplicateDefinition(format!("field '{}'", path)));
            }

            let node = match def {
                FieldDef::Scalar(field) => {
                    let column = format!("{}{}", prefix, field.name);
                    check_identifier("column", &column)?;
                    FieldNode::Scalar(ScalarNode {
                        name: field.name.clone(),
                        path,
                        column,
                        scalar_type: field.scalar_type,
                        nullable: field.nullable,
                        primary: field.primary,
                    })
                }
                FieldDef::Embedded(field) => {
                    let target = self.embeddables.get(field.embedded.as_str()).ok_or_else(|| {
                        Error::UnknownEmbeddable {
                            embeddable: field.embedded.clone(),
                            path: path.clone(),
                        }
                    })?;

                    if stack.iter().any(|name| name == &target.name) {
                        let mut cycle = stack.clone();
                        cycle.push(target.name.clone());
                        return Err(Error::CyclicEmbedding(cycle.join(" -> ")));
                    }

                    let child_prefix = match &field.prefix {
                        PrefixRule::None => prefix.to_string(),
                        PrefixRule::Explicit(explicit) => explicit.clone(),
                        PrefixRule::Inherit => {
                            let own = target
                                .prefix
                                .clone()
                                .unwrap_or_else(|| format!("{}_", field.name));
                            format!("{}{}", prefix, own)
                        }
                    };

                    stack.push(target.name.clone());
                    let fields = self.resolve_fields(&target.fields, &path, &child_prefix, stack)?;
                    stack.pop();

                    FieldNode::Embedded(EmbeddedNode {
                        name: field.name.clone(),
                        path,
                        embeddable: target.name.clone(),
                        prefix: child_prefix,
                        nullable: field.nullable,
                        fields,
                    })
                }
            };
            nodes.push(node);
        }

        Ok(nodes)
    }
}

/// Resolved metadata for every registered entity.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: BTreeMap<String, Arc<EntityMetadata>>,
}

impl Catalog {
    pub fn get(&self, entity: &str) -> Result<&Arc<EntityMetadata>> {
        self.entities
            .get(entity)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityMetadata>> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
