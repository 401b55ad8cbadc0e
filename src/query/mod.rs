//! Query Layer - equality queries over logical paths

pub mod builder;

pub use builder::QueryBuilder;
