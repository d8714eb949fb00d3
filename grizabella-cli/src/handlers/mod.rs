pub mod embedding_definition;
pub mod object;
pub mod object_type;
pub mod query;
pub mod relation;
pub mod relation_type;
