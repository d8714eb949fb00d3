//! Instance Manager (spec §4.7).
//!
//! The write path for object and relation instances: validates against the
//! Schema Manager's cached definitions, writes relational rows and graph
//! nodes/edges, and drives embedding (re)generation on property change.
//! Mirrors the teacher's `MemoryManager`/`MemoryOperations` delegation
//! style — a struct holding `Arc`s to every collaborator it writes through.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::adapters::vector::VectorHit;
use crate::adapters::{GraphAdapter, RelationalAdapter, VectorAdapter};
use crate::error::{GrizabellaError, Result};
use crate::schema_manager::SchemaManager;
use crate::types::{
    EmbeddingDefinition, EmbeddingInstance, MemoryInstance, ObjectInstance, ObjectTypeDefinition,
    PropertyValue, RelationInstance,
};

/// Orchestrates the tri-substrate write path for objects and relations.
pub struct InstanceManager {
    relational: Arc<RelationalAdapter>,
    graph: Arc<GraphAdapter>,
    vector: Arc<VectorAdapter>,
    schema: Arc<SchemaManager>,
}

impl InstanceManager {
    pub fn new(
        relational: Arc<RelationalAdapter>,
        graph: Arc<GraphAdapter>,
        vector: Arc<VectorAdapter>,
        schema: Arc<SchemaManager>,
    ) -> Self {
        Self { relational, graph, vector, schema }
    }

    fn validate_properties(otd: &ObjectTypeDefinition, properties: &HashMap<String, PropertyValue>) -> Result<()> {
        for prop in &otd.properties {
            if prop.is_id() {
                continue;
            }
            match properties.get(&prop.name) {
                Some(value) => {
                    if value.data_type() != prop.data_type {
                        return Err(GrizabellaError::Instance(format!(
                            "property '{}' on '{}' expected {:?}, got {:?}",
                            prop.name, otd.name, prop.data_type, value.data_type()
                        )));
                    }
                }
                None if !prop.nullable => {
                    return Err(GrizabellaError::Instance(format!(
                        "missing required property '{}' on object type '{}'",
                        prop.name, otd.name
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Upsert an object instance. `id`, if `None`, is assigned fresh;
    /// `upsert_date` is always set to now, overriding any caller-supplied
    /// value. Step (4)'s relational write is not rolled back if a later
    /// step fails — callers observe partial state and may retry on the same
    /// id to converge.
    pub async fn upsert_object(
        &self,
        object_type_name: &str,
        id: Option<Uuid>,
        properties: HashMap<String, PropertyValue>,
        weight: Option<f64>,
    ) -> Result<ObjectInstance> {
        let otd = self
            .schema
            .get_object_type(object_type_name)
            .await
            .ok_or_else(|| GrizabellaError::Schema(format!("unknown object type '{object_type_name}'")))?;
        Self::validate_properties(&otd, &properties)?;

        let instance = ObjectInstance {
            memory: MemoryInstance {
                id: id.unwrap_or_else(Uuid::new_v4),
                weight: weight.unwrap_or(1.0),
                upsert_date: chrono::Utc::now(),
            },
            object_type_name: otd.name.clone(),
            properties,
        };

        self.relational.upsert_instance(&otd, &instance).await?;
        self.graph.upsert_object_instance(&otd, &instance).await?;
        self.regenerate_embeddings(&otd, &instance).await?;

        Ok(instance)
    }

    async fn regenerate_embeddings(&self, otd: &ObjectTypeDefinition, instance: &ObjectInstance) -> Result<()> {
        for ed in self.schema.embedding_definitions_for_type(&otd.name).await {
            // Defensive deletion even if no row currently exists.
            self.vector.delete_instances_for_object(instance.id(), &ed.name).await?;

            let source_text = instance
                .properties
                .get(&ed.source_property_name)
                .and_then(PropertyValue::as_text)
                .map(str::trim)
                .filter(|text| !text.is_empty());

            let Some(source_text) = source_text else {
                continue;
            };

            let model = self.vector.get_embedding_model(&ed.embedding_model).await?;
            let vector = model.embed(source_text).await?;
            if vector.len() != ed.dimensions {
                return Err(GrizabellaError::Embedding(format!(
                    "model '{}' produced a {}-dimensional vector, expected {}",
                    ed.embedding_model,
                    vector.len(),
                    ed.dimensions
                )));
            }
            let embedding = EmbeddingInstance::new(instance.id(), ed.name.clone(), vector, source_text);
            self.vector.upsert_instance(&ed, &embedding).await?;
        }
        Ok(())
    }

    /// Delete relational row, detach-delete the graph node, and delete every
    /// ED's embedding row for this object. Idempotent.
    pub async fn delete_object(&self, object_type_name: &str, id: Uuid) -> Result<()> {
        self.relational.delete_instance(object_type_name, id).await?;
        self.graph.delete_object_instance(object_type_name, id).await?;
        for ed in self.schema.embedding_definitions_for_type(object_type_name).await {
            self.vector.delete_instances_for_object(id, &ed.name).await?;
        }
        Ok(())
    }

    async fn object_exists(&self, candidate_otds: &[String], id: Uuid) -> Result<Option<String>> {
        for otd_name in candidate_otds {
            let Some(otd) = self.schema.get_object_type(otd_name).await else {
                continue;
            };
            if !self.relational.get_objects_by_ids(&otd, &[id]).await?.is_empty() {
                return Ok(Some(otd_name.clone()));
            }
        }
        Ok(None)
    }

    /// Write to graph first; if the RTD declares relational properties,
    /// also write the relational edge row keyed by relation id.
    pub async fn upsert_relation(
        &self,
        relation_type_name: &str,
        id: Option<Uuid>,
        source_object_id: Uuid,
        target_object_id: Uuid,
        properties: HashMap<String, PropertyValue>,
        weight: Option<f64>,
    ) -> Result<RelationInstance> {
        let rtd = self
            .schema
            .get_relation_type(relation_type_name)
            .await
            .ok_or_else(|| GrizabellaError::Schema(format!("unknown relation type '{relation_type_name}'")))?;

        let source_type = self.object_exists(&rtd.source_otds, source_object_id).await?.ok_or_else(|| {
            GrizabellaError::Instance(format!(
                "source object {source_object_id} is not an instance of any of {:?}",
                rtd.source_otds
            ))
        })?;
        let target_type = self.object_exists(&rtd.target_otds, target_object_id).await?.ok_or_else(|| {
            GrizabellaError::Instance(format!(
                "target object {target_object_id} is not an instance of any of {:?}",
                rtd.target_otds
            ))
        })?;

        let instance = RelationInstance {
            memory: MemoryInstance {
                id: id.unwrap_or_else(Uuid::new_v4),
                weight: weight.unwrap_or(1.0),
                upsert_date: chrono::Utc::now(),
            },
            relation_type_name: rtd.name.clone(),
            source_object_id,
            target_object_id,
            properties,
        };

        self.graph.upsert_relation_instance(&rtd, &source_type, &target_type, &instance).await?;
        if rtd.has_properties() {
            self.relational.upsert_relation_row(&rtd, &instance).await?;
        }
        Ok(instance)
    }

    /// Update an existing relation's properties in place, preserving its id
    /// (MERGE-by-id rather than delete+re-add; spec §9 open question).
    pub async fn update_relation(
        &self,
        relation_type_name: &str,
        id: Uuid,
        properties: HashMap<String, PropertyValue>,
        weight: Option<f64>,
    ) -> Result<RelationInstance> {
        let existing = self
            .graph
            .get_relation_instance(relation_type_name, id)
            .await?
            .ok_or_else(|| GrizabellaError::Instance(format!("relation '{relation_type_name}' {id} does not exist")))?;

        let mut merged_properties = existing.properties.clone();
        merged_properties.extend(properties);

        self.upsert_relation(
            relation_type_name,
            Some(id),
            existing.source_object_id,
            existing.target_object_id,
            merged_properties,
            weight.or(Some(existing.memory.weight)),
        )
        .await
    }

    pub async fn delete_relation(&self, relation_type_name: &str, id: Uuid) -> Result<bool> {
        let graph_deleted = self.graph.delete_relation_instance(relation_type_name, id).await?;
        if let Some(rtd) = self.schema.get_relation_type(relation_type_name).await {
            if rtd.has_properties() {
                self.relational.delete_relation_row(relation_type_name, id).await?;
            }
        }
        Ok(graph_deleted)
    }

    /// Retrieve the source's vector for `ed_name` and run a similarity
    /// search from it.
    pub async fn find_objects_similar_to_instance(
        &self,
        source_id: Uuid,
        ed_name: &str,
        n_results: usize,
    ) -> Result<Vec<VectorHit>> {
        let source_embedding = self
            .vector
            .get_instance(ed_name, source_id)
            .await?
            .ok_or_else(|| GrizabellaError::Instance(format!("object {source_id} has no embedding under '{ed_name}'")))?;
        self.vector.query_similar(ed_name, &source_embedding.vector, n_results, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embedding::EmbeddingModelCache;
    use crate::config::PoolConfig;
    use crate::pool::ThreadSafeGraphHandle;
    use crate::types::{Property, PropertyDataType, RelationTypeDefinition};

    async fn test_stack() -> (InstanceManager, Arc<SchemaManager>, tempfile::TempDir) {
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
        let schema = Arc::new(SchemaManager::load(relational.clone(), graph.clone(), vector.clone()).await.unwrap());
        let manager = InstanceManager::new(relational, graph, vector, schema.clone());
        (manager, schema, dir)
    }

    #[tokio::test]
    async fn upsert_object_assigns_id_and_generates_embedding() {
        let (manager, schema, _dir) = test_stack().await;
        let otd = ObjectTypeDefinition::new(
            "Paper",
            vec![Property::new("summary", PropertyDataType::Text)],
        );
        schema.create_object_type(otd).await.unwrap();
        let ed = EmbeddingDefinition::new("paper_summary_embedding", "Paper", "summary", "stub", 8);
        schema.create_embedding_definition(ed).await.unwrap();

        let mut props = HashMap::new();
        props.insert("summary".to_string(), PropertyValue::Text("fairness in AI".to_string()));
        let instance = manager.upsert_object("Paper", None, props, None).await.unwrap();

        let hits = manager
            .find_objects_similar_to_instance(instance.id(), "paper_summary_embedding", 1)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object_instance_id, instance.id());
    }

    #[tokio::test]
    async fn upsert_relation_rejects_unknown_endpoint() {
        let (manager, schema, _dir) = test_stack().await;
        schema
            .create_object_type(ObjectTypeDefinition::new("Book", vec![Property::new("title", PropertyDataType::Text)]))
            .await
            .unwrap();
        schema
            .create_object_type(ObjectTypeDefinition::new("Author", vec![Property::new("name", PropertyDataType::Text)]))
            .await
            .unwrap();
        schema
            .create_relation_type(RelationTypeDefinition::new(
                "WRITTEN_BY",
                vec!["Book".to_string()],
                vec!["Author".to_string()],
            ))
            .await
            .unwrap();

        let err = manager
            .upsert_relation("WRITTEN_BY", None, Uuid::new_v4(), Uuid::new_v4(), HashMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GrizabellaError::Instance(_)));
    }

    #[tokio::test]
    async fn delete_object_is_idempotent() {
        let (manager, schema, _dir) = test_stack().await;
        schema
            .create_object_type(ObjectTypeDefinition::new("Book", vec![Property::new("title", PropertyDataType::Text)]))
            .await
            .unwrap();
        let mut props = HashMap::new();
        props.insert("title".to_string(), PropertyValue::Text("1984".to_string()));
        let instance = manager.upsert_object("Book", None, props, None).await.unwrap();

        manager.delete_object("Book", instance.id()).await.unwrap();
        manager.delete_object("Book", instance.id()).await.unwrap();
    }
}
