//! # Grizabella
//!
//! A tri-store knowledge-management engine that unifies a relational store,
//! a vector store, and a graph store behind one schema and one query
//! surface. Callers define object types, relation types, and embedding
//! definitions once; Grizabella projects each definition into all three
//! substrates and keeps them consistent across writes.
//!
//! ## Quick start
//!
//! ```no_run
//! use grizabella_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let db = GrizabellaDb::connect("my_knowledge_base", true).await?;
//!     db.create_object_type(ObjectTypeDefinition::new("Document", vec![])).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Schema Manager**: owns object/relation/embedding definitions and
//!   projects them into all three substrates atomically.
//! - **Instance Manager**: the write path for object and relation instances,
//!   including embedding (re)generation.
//! - **Query planner/executor**: compiles a boolean tree of clauses into
//!   per-substrate sub-queries composed via set algebra.
//! - **Connection Pool**: bounded, per-substrate connection pools plus a
//!   dedicated thread for the non-`Send` Kuzu connection.
//! - **Database Manager Factory**: a refcounted singleton registry so
//!   repeated opens of the same path share one set of pools.

pub mod adapters;
pub mod config;
pub mod db_manager;
pub mod db_manager_factory;
pub mod error;
pub mod instance_manager;
pub mod logging;
pub mod path_resolver;
pub mod pool;
pub mod query;
pub mod resource_monitor;
pub mod schema_manager;
pub mod types;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::config::{ConfigBuilder, GrizabellaConfig, LogLevel};
    pub use crate::db_manager::GrizabellaDb;
    pub use crate::db_manager_factory::DbManagerFactory;
    pub use crate::error::{ErrorCategory, ErrorEnvelope, GrizabellaError, Result};
    pub use crate::query::{Clause, ComplexQuery, LogicalOperator, QueryResult};
    pub use crate::types::{
        EmbeddingDefinition, EmbeddingInstance, ObjectInstance, ObjectTypeDefinition,
        PropertyDataType, PropertyValue, RelationInstance, RelationTypeDefinition,
    };
}

/// Current library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{GrizabellaError, Result};
