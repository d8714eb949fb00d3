//! Schema Manager (spec §4.6).
//!
//! The authoritative, in-memory cache of every object/relation/embedding
//! definition and the only component allowed to call the three adapters'
//! schema APIs. On construction it reads persisted definitions back from the
//! Relational Adapter and rebuilds the cache, directly mirroring the
//! teacher's `RelationshipTypeRegistry` shape: `Arc<RwLock<HashMap<...>>>`
//! plus an `Arc<dyn ...>` persistence delegate.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::adapters::{GraphAdapter, RelationalAdapter, VectorAdapter};
use crate::error::{GrizabellaError, Result};
use crate::types::{DefinitionKind, EmbeddingDefinition, ObjectTypeDefinition, RelationTypeDefinition};

/// Source-of-truth registry of schema definitions, projected into all three
/// substrates on creation.
pub struct SchemaManager {
    relational: Arc<RelationalAdapter>,
    graph: Arc<GraphAdapter>,
    vector: Arc<VectorAdapter>,
    object_types: RwLock<HashMap<String, ObjectTypeDefinition>>,
    relation_types: RwLock<HashMap<String, RelationTypeDefinition>>,
    embedding_definitions: RwLock<HashMap<String, EmbeddingDefinition>>,
}

impl SchemaManager {
    /// Construct the manager and rebuild its cache from whatever definitions
    /// are already persisted in the relational metadata tables.
    pub async fn load(
        relational: Arc<RelationalAdapter>,
        graph: Arc<GraphAdapter>,
        vector: Arc<VectorAdapter>,
    ) -> Result<Self> {
        let manager = Self {
            relational,
            graph,
            vector,
            object_types: RwLock::new(HashMap::new()),
            relation_types: RwLock::new(HashMap::new()),
            embedding_definitions: RwLock::new(HashMap::new()),
        };

        for (_, json) in manager.relational.list_definitions(DefinitionKind::ObjectType).await? {
            let otd: ObjectTypeDefinition = serde_json::from_str(&json)
                .map_err(|e| GrizabellaError::Schema(format!("corrupt object type definition: {e}")))?;
            manager.object_types.write().await.insert(otd.name.clone(), otd);
        }
        for (_, json) in manager.relational.list_definitions(DefinitionKind::RelationType).await? {
            let rtd: RelationTypeDefinition = serde_json::from_str(&json)
                .map_err(|e| GrizabellaError::Schema(format!("corrupt relation type definition: {e}")))?;
            manager.relation_types.write().await.insert(rtd.name.clone(), rtd);
        }
        for (_, json) in manager.relational.list_definitions(DefinitionKind::EmbeddingDefinition).await? {
            let ed: EmbeddingDefinition = serde_json::from_str(&json)
                .map_err(|e| GrizabellaError::Schema(format!("corrupt embedding definition: {e}")))?;
            manager.embedding_definitions.write().await.insert(ed.name.clone(), ed);
        }

        Ok(manager)
    }

    // ---- Object types ------------------------------------------------------

    /// Project an OTD into the relational and graph substrates, persist it,
    /// and commit it to the cache. A partial failure compensates with
    /// reverse-order drops and returns `SchemaError`.
    pub async fn create_object_type(&self, otd: ObjectTypeDefinition) -> Result<()> {
        otd.validate()?;
        if self.object_types.read().await.contains_key(&otd.name) {
            return Err(GrizabellaError::Schema(format!("object type '{}' already exists", otd.name)));
        }

        self.relational.create_table(&otd).await?;
        if let Err(e) = self.graph.create_node_table(&otd).await {
            let _ = self.relational.drop_table(&crate::adapters::relational::object_table_name(&otd.name)).await;
            return Err(e);
        }

        let json = serde_json::to_string(&otd)
            .map_err(|e| GrizabellaError::Schema(format!("failed to serialize object type: {e}")))?;
        if let Err(e) = self.relational.save_definition(DefinitionKind::ObjectType, &otd.name, json).await {
            let _ = self.graph.drop_node_table(&otd.name).await;
            let _ = self.relational.drop_table(&crate::adapters::relational::object_table_name(&otd.name)).await;
            return Err(e);
        }

        self.object_types.write().await.insert(otd.name.clone(), otd);
        Ok(())
    }

    pub async fn get_object_type(&self, name: &str) -> Option<ObjectTypeDefinition> {
        self.object_types.read().await.get(name).cloned()
    }

    pub async fn list_object_types(&self) -> Vec<ObjectTypeDefinition> {
        self.object_types.read().await.values().cloned().collect()
    }

    /// Deletes cascade to all instances and incident relations; callers
    /// (Instance Manager) are expected to have already cleared instance
    /// rows before invoking this, but the table drop itself is idempotent.
    pub async fn delete_object_type(&self, name: &str) -> Result<()> {
        if !self.object_types.read().await.contains_key(name) {
            return Err(GrizabellaError::Schema(format!("object type '{name}' does not exist")));
        }
        self.graph.drop_node_table(name).await?;
        self.relational.drop_table(&crate::adapters::relational::object_table_name(name)).await?;
        self.relational.delete_definition(DefinitionKind::ObjectType, name).await?;
        self.object_types.write().await.remove(name);
        Ok(())
    }

    // ---- Relation types -----------------------------------------------------

    pub async fn create_relation_type(&self, rtd: RelationTypeDefinition) -> Result<()> {
        if self.relation_types.read().await.contains_key(&rtd.name) {
            return Err(GrizabellaError::Schema(format!("relation type '{}' already exists", rtd.name)));
        }
        let object_types = self.object_types.read().await;
        for otd_name in rtd.source_otds.iter().chain(rtd.target_otds.iter()) {
            if !object_types.contains_key(otd_name) {
                return Err(GrizabellaError::Schema(format!(
                    "relation type '{}' references unknown object type '{otd_name}'",
                    rtd.name
                )));
            }
        }
        drop(object_types);

        self.graph.create_rel_table(&rtd).await?;
        if rtd.has_properties() {
            if let Err(e) = self.relational.create_relation_table(&rtd).await {
                let _ = self.graph.drop_rel_table(&rtd.name).await;
                return Err(e);
            }
        }

        let json = serde_json::to_string(&rtd)
            .map_err(|e| GrizabellaError::Schema(format!("failed to serialize relation type: {e}")))?;
        if let Err(e) = self.relational.save_definition(DefinitionKind::RelationType, &rtd.name, json).await {
            if rtd.has_properties() {
                let _ = self.relational.drop_table(&crate::adapters::relational::relation_table_name(&rtd.name)).await;
            }
            let _ = self.graph.drop_rel_table(&rtd.name).await;
            return Err(e);
        }

        self.relation_types.write().await.insert(rtd.name.clone(), rtd);
        Ok(())
    }

    pub async fn get_relation_type(&self, name: &str) -> Option<RelationTypeDefinition> {
        self.relation_types.read().await.get(name).cloned()
    }

    pub async fn list_relation_types(&self) -> Vec<RelationTypeDefinition> {
        self.relation_types.read().await.values().cloned().collect()
    }

    pub async fn delete_relation_type(&self, name: &str) -> Result<()> {
        let rtd = self
            .relation_types
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| GrizabellaError::Schema(format!("relation type '{name}' does not exist")))?;
        self.graph.drop_rel_table(name).await?;
        if rtd.has_properties() {
            self.relational.drop_table(&crate::adapters::relational::relation_table_name(name)).await?;
        }
        self.relational.delete_definition(DefinitionKind::RelationType, name).await?;
        self.relation_types.write().await.remove(name);
        Ok(())
    }

    // ---- Embedding definitions ----------------------------------------------

    /// Requires the target OTD and its source property to exist and be
    /// `TEXT`.
    pub async fn create_embedding_definition(&self, ed: EmbeddingDefinition) -> Result<()> {
        ed.validate()?;
        if self.embedding_definitions.read().await.contains_key(&ed.name) {
            return Err(GrizabellaError::Schema(format!("embedding definition '{}' already exists", ed.name)));
        }
        let otd = self
            .object_types
            .read()
            .await
            .get(&ed.object_type_name)
            .cloned()
            .ok_or_else(|| {
                GrizabellaError::Schema(format!(
                    "embedding definition '{}' references unknown object type '{}'",
                    ed.name, ed.object_type_name
                ))
            })?;
        let prop = otd.property(&ed.source_property_name).ok_or_else(|| {
            GrizabellaError::Schema(format!(
                "embedding definition '{}' references unknown property '{}' on '{}'",
                ed.name, ed.source_property_name, ed.object_type_name
            ))
        })?;
        if prop.data_type != crate::types::PropertyDataType::Text {
            return Err(GrizabellaError::Schema(format!(
                "embedding definition '{}' source property '{}' must be TEXT",
                ed.name, ed.source_property_name
            )));
        }

        self.vector.create_table(&ed).await?;
        let json = serde_json::to_string(&ed)
            .map_err(|e| GrizabellaError::Schema(format!("failed to serialize embedding definition: {e}")))?;
        if let Err(e) = self.relational.save_definition(DefinitionKind::EmbeddingDefinition, &ed.name, json).await {
            return Err(e);
        }

        self.embedding_definitions.write().await.insert(ed.name.clone(), ed);
        Ok(())
    }

    pub async fn get_embedding_definition(&self, name: &str) -> Option<EmbeddingDefinition> {
        self.embedding_definitions.read().await.get(name).cloned()
    }

    pub async fn list_embedding_definitions(&self) -> Vec<EmbeddingDefinition> {
        self.embedding_definitions.read().await.values().cloned().collect()
    }

    /// Every ED whose target OTD is `object_type_name`.
    pub async fn embedding_definitions_for_type(&self, object_type_name: &str) -> Vec<EmbeddingDefinition> {
        self.embedding_definitions
            .read()
            .await
            .values()
            .filter(|ed| ed.object_type_name == object_type_name)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embedding::EmbeddingModelCache;
    use crate::config::PoolConfig;
    use crate::pool::ThreadSafeGraphHandle;
    use crate::types::{Property, PropertyDataType};

    async fn test_manager() -> (SchemaManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let relational = Arc::new(
            RelationalAdapter::open(&dir.path().join("sqlite.db"), &PoolConfig::default())
                .await
                .unwrap(),
        );
        let graph_dir = dir.path().join("kuzu_data");
        std::fs::create_dir_all(&graph_dir).unwrap();
        let handle = ThreadSafeGraphHandle::open(&graph_dir).unwrap();
        let graph = Arc::new(GraphAdapter::new(handle));
        let vector = Arc::new(
            VectorAdapter::open(&dir.path().join("lancedb_data"), EmbeddingModelCache::new())
                .await
                .unwrap(),
        );
        let manager = SchemaManager::load(relational, graph, vector).await.unwrap();
        (manager, dir)
    }

    #[tokio::test]
    async fn create_object_type_then_relation_type_then_embedding_definition() {
        let (manager, _dir) = test_manager().await;
        let book = ObjectTypeDefinition::new(
            "Book",
            vec![Property::new("title", PropertyDataType::Text), Property::new("summary", PropertyDataType::Text)],
        );
        manager.create_object_type(book).await.unwrap();
        let author = ObjectTypeDefinition::new("Author", vec![Property::new("name", PropertyDataType::Text)]);
        manager.create_object_type(author).await.unwrap();

        let rtd = RelationTypeDefinition::new("WRITTEN_BY", vec!["Book".to_string()], vec!["Author".to_string()]);
        manager.create_relation_type(rtd).await.unwrap();
        assert!(manager.get_relation_type("WRITTEN_BY").await.is_some());

        let ed = EmbeddingDefinition::new("book_summary_embedding", "Book", "summary", "stub", 8);
        manager.create_embedding_definition(ed).await.unwrap();
        assert!(manager.get_embedding_definition("book_summary_embedding").await.is_some());
    }

    #[tokio::test]
    async fn relation_type_rejects_unknown_object_type() {
        let (manager, _dir) = test_manager().await;
        let rtd = RelationTypeDefinition::new("WRITTEN_BY", vec!["Book".to_string()], vec!["Author".to_string()]);
        assert!(manager.create_relation_type(rtd).await.is_err());
    }

    #[tokio::test]
    async fn embedding_definition_rejects_non_text_source() {
        let (manager, _dir) = test_manager().await;
        let book = ObjectTypeDefinition::new("Book", vec![Property::new("year", PropertyDataType::Integer)]);
        manager.create_object_type(book).await.unwrap();
        let ed = EmbeddingDefinition::new("bad_embedding", "Book", "year", "stub", 8);
        assert!(manager.create_embedding_definition(ed).await.is_err());
    }

    #[tokio::test]
    async fn delete_object_type_removes_from_cache() {
        let (manager, _dir) = test_manager().await;
        let book = ObjectTypeDefinition::new("Book", vec![Property::new("title", PropertyDataType::Text)]);
        manager.create_object_type(book).await.unwrap();
        manager.delete_object_type("Book").await.unwrap();
        assert!(manager.get_object_type("Book").await.is_none());
    }
}
