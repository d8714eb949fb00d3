//! Per-substrate adapters: relational (spec §4.2), vector (spec §4.3), and
//! graph (spec §4.4). Each adapter owns its own connection pool and exposes
//! an `async_trait` surface the Schema Manager, Instance Manager, and query
//! executor call through; no caller touches a substrate driver directly.

pub mod embedding;
pub mod graph;
pub mod relational;
pub mod vector;

pub use embedding::{EmbeddingModel, EmbeddingModelCache, StubEmbeddingModel};
pub use graph::GraphAdapter;
pub use relational::RelationalAdapter;
pub use vector::VectorAdapter;

/// Turn an arbitrary definition name into a safe SQL/Cypher/Lance identifier:
/// lowercase ascii alphanumerics and underscores only, with a `t_`/`r_`/`e_`
/// prefix supplied by the caller so object, relation, and embedding tables
/// can never collide even if their source names do.
pub(crate) fn sanitize_identifier(prefix: &str, name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{prefix}{cleaned}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_identifier_normalizes_and_prefixes() {
        assert_eq!(sanitize_identifier("t_", "My Object-Type"), "t_my_object_type");
    }
}
