//! The data model: properties, schema definitions, and concrete instances.

mod definitions;
mod instance;
mod property;

pub use definitions::{DefinitionKind, EmbeddingDefinition, ObjectTypeDefinition, RelationTypeDefinition};
pub use instance::{EmbeddingInstance, MemoryInstance, ObjectInstance, RelationInstance, EMBEDDING_PREVIEW_MAX_CHARS};
pub use property::{Property, PropertyDataType, PropertyValue};
