//! Mapping context - the explicitly owned registry and store
//!
//! Created once at startup with [`MappingContext::init`], passed by
//! reference to whatever needs to read or write entities, and consumed by
//! [`MappingContext::close`] at shutdown. Nothing here is global.

use crate::config::{DebugFlag, EmbedmapConfig};
use crate::mapping::{Catalog, EntityMetadata, SchemaRegistry};
use crate::query::QueryBuilder;
use crate::storage::SqliteStore;
use crate::value::Value;
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// A Rust type stored as a registered entity.
///
/// The type's serde representation must match the entity's logical field
/// names (typically via `#[serde(rename_all = "camelCase")]`).
pub trait Entity: Serialize + DeserializeOwned {
    /// Registered entity name
    const NAME: &'static str;
}

pub struct MappingContext {
    catalog: Catalog,
    store: SqliteStore,
}

impl MappingContext {
    /// Resolve the registry and open the configured database.
    pub fn init(config: &EmbedmapConfig, registry: &SchemaRegistry) -> Result<Self> {
        let catalog = registry.build()?;

        let store = if config.is_in_memory() {
            SqliteStore::open_in_memory()?
        } else {
            let database = config.database.as_deref().unwrap_or_default();
            SqliteStore::open(Path::new(database))?
        };
        let store = store.with_logging(config.query_logging());

        if config.debug_enabled(DebugFlag::Discovery) {
            for meta in catalog.iter() {
                tracing::info!(
                    "Entity {} -> table {} ({})",
                    meta.name(),
                    meta.table(),
                    meta.column_names().join(", ")
                );
            }
        }

        tracing::info!(
            entities = catalog.len(),
            database = config.database.as_deref().unwrap_or(crate::config::IN_MEMORY),
            "Mapping context initialized"
        );
        Ok(Self { catalog, store })
    }

    /// In-memory context with default configuration
    pub fn in_memory(registry: &SchemaRegistry) -> Result<Self> {
        Self::init(&EmbedmapConfig::in_memory(), registry)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn metadata(&self, entity: &str) -> Result<&Arc<EntityMetadata>> {
        self.catalog.get(entity)
    }

    // ========== Schema Lifecycle ==========

    /// Create every registered table that does not exist yet
    pub fn create_schema(&self) -> Result<()> {
        for meta in self.catalog.iter() {
            self.store.create_table(meta)?;
        }
        Ok(())
    }

    /// Drop every registered table
    pub fn drop_schema(&self) -> Result<()> {
        for meta in self.catalog.iter() {
            self.store.drop_table(meta)?;
        }
        Ok(())
    }

    /// Drop and recreate every registered table, leaving them empty
    pub fn refresh_database(&self) -> Result<()> {
        self.drop_schema()?;
        self.create_schema()
    }

    // ========== Entity Operations ==========

    /// Flatten and insert an instance of the named entity
    pub fn persist(&self, entity: &str, instance: &serde_json::Value) -> Result<()> {
        let meta = self.catalog.get(entity)?;
        let row = meta.flatten(instance)?;
        self.store.insert_row(meta, &row)
    }

    /// Typed form of [`persist`](Self::persist)
    pub fn insert<T: Entity>(&self, value: &T) -> Result<()> {
        let instance = serde_json::to_value(value)?;
        self.persist(T::NAME, &instance)
    }

    /// Load one instance by primary key
    pub fn find_one(&self, entity: &str, id: &str) -> Result<Option<serde_json::Value>> {
        let meta = self.catalog.get(entity)?;
        let pk = meta.primary_key().name.as_str();
        let rows = self.store.select_where(meta, &[(pk, Value::from(id))], Some(1))?;

        rows.first().map(|row| meta.materialize(row)).transpose()
    }

    /// Typed form of [`find_one`](Self::find_one)
    pub fn find<T: Entity>(&self, id: &str) -> Result<Option<T>> {
        match self.find_one(T::NAME, id)? {
            Some(instance) => Ok(Some(serde_json::from_value(instance)?)),
            None => Ok(None),
        }
    }

    /// Delete one instance by primary key; returns whether a row was removed
    pub fn remove(&self, entity: &str, id: &str) -> Result<bool> {
        let meta = self.catalog.get(entity)?;
        let pk = meta.primary_key().name.as_str();
        let removed = self.store.delete_where(meta, &[(pk, Value::from(id))])?;
        Ok(removed > 0)
    }

    pub fn count(&self, entity: &str) -> Result<usize> {
        let meta = self.catalog.get(entity)?;
        self.store.count(meta)
    }

    /// Start a query against the named entity
    pub fn query(&self, entity: &str) -> Result<QueryBuilder<'_>> {
        let meta = self.catalog.get(entity)?;
        Ok(QueryBuilder::new(&self.store, Arc::clone(meta)))
    }

    /// Close the underlying connection
    pub fn close(self) -> Result<()> {
        tracing::info!("Closing mapping context");
        self.store.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EmbeddableDef, EntityDef, FieldDef, PrefixRule, ScalarType};
    use crate::Error;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Address {
        street: String,
        city: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Customer {
        id: String,
        billing_address: Address,
        shipping_address: Option<Address>,
    }

    impl Entity for Customer {
        const NAME: &'static str = "Customer";
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .embeddable(
                EmbeddableDef::new("Address")
                    .field(FieldDef::scalar("street", ScalarType::Text))
                    .field(FieldDef::scalar("city", ScalarType::Text)),
            )
            .entity(
                EntityDef::new("Customer")
                    .field(FieldDef::scalar("id", ScalarType::Text).primary())
                    .field(FieldDef::embedded("billingAddress", "Address").prefix(PrefixRule::explicit("billing_")))
                    .field(
                        FieldDef::embedded("shippingAddress", "Address")
                            .prefix(PrefixRule::explicit("shipping_"))
                            .nullable(),
                    ),
            )
    }

    fn customer(id: &str, shipping: bool) -> Customer {
        let address = Address { street: "1 Main St".into(), city: "Springfield".into() };
        Customer {
            id: id.into(),
            billing_address: address.clone(),
            shipping_address: shipping.then_some(address),
        }
    }

    #[test]
    fn test_typed_insert_and_find() {
        let ctx = MappingContext::in_memory(&registry()).unwrap();
        ctx.refresh_database().unwrap();

        ctx.insert(&customer("c1", true)).unwrap();
        ctx.insert(&customer("c2", false)).unwrap();

        assert_eq!(ctx.find::<Customer>("c1").unwrap(), Some(customer("c1", true)));
        assert_eq!(ctx.find::<Customer>("c2").unwrap(), Some(customer("c2", false)));
        assert_eq!(ctx.find::<Customer>("missing").unwrap(), None);
        assert_eq!(ctx.count("Customer").unwrap(), 2);

        ctx.close().unwrap();
    }

    #[test]
    fn test_table_uses_physical_columns() {
        let ctx = MappingContext::in_memory(&registry()).unwrap();
        ctx.create_schema().unwrap();

        assert_eq!(
            ctx.store().table_columns("customer").unwrap(),
            vec!["id", "billing_street", "billing_city", "shipping_street", "shipping_city"]
        );
    }

    #[test]
    fn test_refresh_database_clears_rows() {
        let ctx = MappingContext::in_memory(&registry()).unwrap();
        ctx.refresh_database().unwrap();
        ctx.insert(&customer("c1", false)).unwrap();

        ctx.refresh_database().unwrap();
        assert_eq!(ctx.count("Customer").unwrap(), 0);
    }

    #[test]
    fn test_remove() {
        let ctx = MappingContext::in_memory(&registry()).unwrap();
        ctx.refresh_database().unwrap();
        ctx.insert(&customer("c1", true)).unwrap();

        assert!(ctx.remove("Customer", "c1").unwrap());
        assert!(!ctx.remove("Customer", "c1").unwrap());
        assert!(ctx.find_one("Customer", "c1").unwrap().is_none());
    }

    #[test]
    fn test_unknown_entity() {
        let ctx = MappingContext::in_memory(&registry()).unwrap();
        let err = ctx.persist("Order", &json!({ "id": "o1" })).unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(ref name) if name == "Order"));
    }

    #[test]
    fn test_duplicate_primary_key_rejected() {
        let ctx = MappingContext::in_memory(&registry()).unwrap();
        ctx.refresh_database().unwrap();
        ctx.insert(&customer("c1", false)).unwrap();

        let err = ctx.insert(&customer("c1", true)).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_on_disk_database_persists_across_contexts() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmbedmapConfig {
            database: Some(dir.path().join("customers.db").to_string_lossy().to_string()),
            ..EmbedmapConfig::default()
        }
        .with_debug(&[DebugFlag::Query, DebugFlag::Discovery]);

        let ctx = MappingContext::init(&config, &registry()).unwrap();
        ctx.refresh_database().unwrap();
        ctx.insert(&customer("c1", true)).unwrap();
        ctx.close().unwrap();

        let reopened = MappingContext::init(&config, &registry()).unwrap();
        assert_eq!(reopened.find::<Customer>("c1").unwrap(), Some(customer("c1", true)));
    }
}
