//! Mapping Layer - resolved schema metadata and the embedded-value mapper
//!
//! - `registry`: resolves definitions into per-entity metadata, validating eagerly
//! - `metadata`: the resolved field tree and its physical columns
//! - `mapper`: flatten instances into rows, materialize rows into instances

pub mod metadata;
pub mod registry;
pub mod mapper;

pub use metadata::{compute_physical_columns, EmbeddedNode, EntityMetadata, FieldNode, PhysicalColumn, ScalarNode};
pub use registry::{Catalog, SchemaRegistry};
pub use mapper::{flatten, materialize};
